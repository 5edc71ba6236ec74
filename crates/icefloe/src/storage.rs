//! Disk layout declarations.
//!
//! The VM spec creates the raw disks (boot + data); Ansible
//! partitions, formats and mounts them:
//!
//!   scsi0 (boot disk)  -> /      (ext4, managed by cloud-init)
//!   scsi1 (data disk)  -> /data  (ext4, formatted + mounted by Ansible)
//!
//! The /data mount holds all persistent service data.

use anyhow::Result;
use icefloe_engine::StackOutputs;

/// Directories Ansible should create under /data.
pub fn data_paths() -> Vec<&'static str> {
    vec![
        "/data/containers", // Podman container storage
        "/data/forgejo",    // Forgejo repositories + data
        "/data/woodpecker", // Woodpecker server state
        "/data/registry",   // Docker registry layers
        "/data/postgresql", // PostgreSQL data directory
        "/data/libvirt",    // Libvirt VM storage
        "/data/docker",     // Docker data root
    ]
}

/// Publish the expected /data layout for the Ansible inventory.
pub fn export(outputs: &mut StackOutputs, data_disk_gb: u32) -> Result<()> {
    outputs.export("data_disk_gb", data_disk_gb)?;
    outputs.export("data_paths", data_paths())?;
    Ok(())
}
