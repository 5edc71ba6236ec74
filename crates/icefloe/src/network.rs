//! Network facts and firewall declarations.
//!
//! Proxmox-level networking (bridge, static IP) is configured in the
//! VM spec via cloud-init; this module only publishes the resolved
//! values so downstream tooling (Ansible dynamic inventory, CI
//! scripts) can consume them. Host-level ufw/nftables rules are
//! configured by Ansible from the exported port list; nothing here
//! touches a firewall.

use anyhow::Result;
use icefloe_config::StackConfig;
use icefloe_engine::{Output, StackOutputs};

/// TCP ports that should be open on the host.
pub fn firewall_ports() -> Vec<u16> {
    vec![
        22,   // OpenSSH
        80,   // Caddy HTTP
        443,  // Caddy HTTPS
        2222, // Forgejo Git SSH
        5000, // Docker Registry
        9090, // Cockpit
    ]
}

/// Publish network facts. The address may still be resolving; the
/// registry holds the future itself, not a blocking read.
pub fn export(outputs: &mut StackOutputs, config: &StackConfig, ip: Output<String>) -> Result<()> {
    outputs.export_deferred("vm_ip", ip)?;
    outputs.export("vm_hostname", &config.hostname)?;
    outputs.export("ssh_user", &config.ssh_user)?;
    outputs.export("ssh_port", config.ssh_port)?;
    outputs.export("network_bridge", &config.network_bridge)?;
    outputs.export("network_gateway", &config.gateway)?;
    outputs.export("firewall_ports", firewall_ports())?;
    Ok(())
}
