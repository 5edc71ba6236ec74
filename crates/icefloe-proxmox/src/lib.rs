//! Proxmox VE provider for icefloe
//!
//! Provisions a single virtual machine by cloning a cloud-init
//! template, then resolves the machine's IPv4 address either from the
//! statically configured address or from the QEMU guest agent's
//! post-boot interface report.

pub mod api;
pub mod error;
pub mod provision;
pub mod spec;

// Re-exports
pub use api::{ProxmoxClient, VmApi};
pub use error::{ProxmoxError, Result};
pub use provision::{select_address, AgentPollPolicy, Provisioner, VmHandle};
pub use spec::{split_ssh_keys, strip_cidr, NetworkAddressMode, VmSpec};
