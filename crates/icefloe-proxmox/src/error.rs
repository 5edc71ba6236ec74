//! Proxmox provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxmoxError {
    #[error("PROXMOX_VE_API_TOKEN is not set. Create an API token in the Proxmox UI and export it as user@realm!tokenid=uuid")]
    MissingToken,

    #[error("Proxmox API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Proxmox task {upid} failed: {status}")]
    TaskFailed { upid: String, status: String },

    #[error("template VM {template} not found on node {node}")]
    TemplateNotFound { node: String, template: u32 },

    #[error("provisioning {vm}: {source}")]
    Provision {
        vm: String,
        #[source]
        source: Box<ProxmoxError>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxmoxError {
    /// Wrap an engine-level failure with the identity of the VM it
    /// concerns (`node/vmid`).
    pub fn provision(vm: impl Into<String>, source: ProxmoxError) -> Self {
        ProxmoxError::Provision {
            vm: vm.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxmoxError>;
