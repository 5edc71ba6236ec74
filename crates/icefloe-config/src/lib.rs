//! Stack configuration for icefloe
//!
//! One YAML file describes the whole stack. Discovery order:
//!
//! 1. `ICEFLOE_CONFIG` environment variable (direct path)
//! 2. `./icefloe.yaml`, `./icefloe.yml`
//! 3. `./.icefloe/icefloe.yaml`
//! 4. `~/.config/icefloe/icefloe.yaml`
//!
//! Credentials never live in this file; the Proxmox API token and the
//! GCP access token come from the environment.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operator-supplied settings with defaults applied by serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Proxmox VE API endpoint, e.g. "https://pve.example:8006".
    pub api_url: String,

    /// Accept the cluster's self-signed TLS certificate.
    #[serde(default)]
    pub insecure_tls: bool,

    /// Proxmox target node.
    pub node: String,

    /// VM ID of the cloud-init template to clone from.
    pub template_vm_id: u32,

    #[serde(default = "default_vm_id")]
    pub vm_id: u32,

    #[serde(default = "default_hostname")]
    pub hostname: String,

    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: u16,

    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,

    #[serde(default = "default_boot_disk_gb")]
    pub boot_disk_gb: u32,

    #[serde(default = "default_data_disk_gb")]
    pub data_disk_gb: u32,

    #[serde(default = "default_cloud_init_template")]
    pub cloud_init_template: String,

    #[serde(default = "default_storage_pool")]
    pub storage_pool: String,

    #[serde(default = "default_network_bridge")]
    pub network_bridge: String,

    /// Static IP in CIDR notation. Empty means DHCP.
    #[serde(default)]
    pub ip_address: String,

    #[serde(default)]
    pub gateway: String,

    #[serde(default)]
    pub nameserver: String,

    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    /// Informational only; the firewall port list already contains 22.
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Newline-separated SSH public keys.
    #[serde(default)]
    pub ssh_public_keys: String,

    /// GCP project owning the managed DNS zone.
    #[serde(default)]
    pub gcp_project: String,

    /// GCP Cloud DNS managed zone name. DNS records are only managed
    /// when both this and `dns_domain` are set.
    #[serde(default)]
    pub gcp_dns_zone: String,

    /// Base domain for service records.
    #[serde(default)]
    pub dns_domain: String,
}

fn default_vm_id() -> u32 {
    200
}
fn default_hostname() -> String {
    "antarctica".to_string()
}
fn default_cpu_cores() -> u16 {
    4
}
fn default_memory_mb() -> u32 {
    8192
}
fn default_boot_disk_gb() -> u32 {
    50
}
fn default_data_disk_gb() -> u32 {
    100
}
fn default_cloud_init_template() -> String {
    "debian-12-cloudinit".to_string()
}
fn default_storage_pool() -> String {
    "local-lvm".to_string()
}
fn default_network_bridge() -> String {
    "vmbr0".to_string()
}
fn default_ssh_user() -> String {
    "antarctica".to_string()
}
fn default_ssh_port() -> u16 {
    22
}

impl StackConfig {
    /// Load the stack config from the discovered file.
    pub fn load() -> Result<Self> {
        let path = find_stack_file()?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StackConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.is_empty() {
            return Err(ConfigError::Invalid("node must not be empty".into()));
        }
        if self.hostname.is_empty() {
            return Err(ConfigError::Invalid("hostname must not be empty".into()));
        }
        if self.vm_id == 0 {
            return Err(ConfigError::Invalid("vm_id must be positive".into()));
        }
        if self.template_vm_id == self.vm_id {
            return Err(ConfigError::Invalid(
                "template_vm_id must differ from vm_id (a VM cannot clone itself)".into(),
            ));
        }
        Ok(())
    }

    /// Whether the DNS fan-out is enabled: both the managed zone and
    /// the base domain must be configured.
    pub fn dns_enabled(&self) -> bool {
        !self.gcp_dns_zone.is_empty() && !self.dns_domain.is_empty()
    }
}

/// Find the stack config file, local-first.
pub fn find_stack_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("ICEFLOE_CONFIG") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["icefloe.yaml", "icefloe.yml"];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let dot_dir = current_dir.join(".icefloe");
    if dot_dir.is_dir() {
        for filename in &candidates {
            let path = dot_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("icefloe").join("icefloe.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::StackFileNotFound)
}
