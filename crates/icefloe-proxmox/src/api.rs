//! Proxmox VE API client
//!
//! Thin wrapper over the `/api2/json` HTTP API using an API token
//! (`PVEAPIToken` authorization header). Mutating endpoints return a
//! UPID task identifier; the client waits for the task to finish and
//! surfaces a non-OK exit status as an error.

use crate::error::{ProxmoxError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable holding the API token
/// (`user@realm!tokenid=uuid`).
pub const TOKEN_ENV: &str = "PROXMOX_VE_API_TOKEN";

const TASK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Provisioning-engine boundary for a single Proxmox VM.
///
/// The provisioner is written against this trait so the pipeline can
/// be exercised with an in-memory fake.
#[async_trait]
pub trait VmApi: Send + Sync {
    /// Proxmox VE version string, used as a reachability/auth probe.
    async fn version(&self) -> Result<String>;

    /// Current qemu status of the VM (`running`, `stopped`, ...), or
    /// `None` when no VM with this id exists on the node.
    async fn vm_status(&self, node: &str, vmid: u32) -> Result<Option<String>>;

    /// Full-clone a template into a new VM.
    async fn clone_vm(&self, node: &str, template_vmid: u32, vmid: u32, name: &str) -> Result<()>;

    /// Apply config parameters to the VM.
    async fn configure_vm(&self, node: &str, vmid: u32, params: &[(String, String)]) -> Result<()>;

    /// Grow a disk to `size_gb` (no-op when already that size or larger).
    async fn resize_disk(&self, node: &str, vmid: u32, disk: &str, size_gb: u32) -> Result<()>;

    async fn start_vm(&self, node: &str, vmid: u32) -> Result<()>;

    /// Per-interface IPv4 address lists as reported by the QEMU guest
    /// agent, in interface order (index 0 is conventionally loopback).
    /// `Ok(None)` while the agent has not checked in yet.
    async fn agent_interfaces(&self, node: &str, vmid: u32) -> Result<Option<Vec<Vec<String>>>>;
}

/// HTTP client for one Proxmox VE endpoint.
#[derive(Clone)]
pub struct ProxmoxClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ProxmoxClient {
    /// Build a client for `api_url` (e.g. `https://pve.example:8006`),
    /// reading the token from [`TOKEN_ENV`].
    pub fn from_env(api_url: &str, insecure_tls: bool) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| ProxmoxError::MissingToken)?;
        Self::new(api_url, &token, insecure_tls)
    }

    pub fn new(api_url: &str, token: &str, insecure_tls: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            // Homelab clusters commonly run the default self-signed cert.
            .danger_accept_invalid_certs(insecure_tls)
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/api2/json", api_url.trim_end_matches('/')),
            token: token.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("PVEAPIToken={}", self.token)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        Self::unwrap_data(response).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .form(form)
            .send()
            .await?;

        Self::unwrap_data(response).await
    }

    async fn put<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "PUT");

        let response = self
            .http
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .form(form)
            .send()
            .await?;

        Self::unwrap_data(response).await
    }

    async fn unwrap_data<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProxmoxError::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let envelope: ApiResponse<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// Wait for a UPID task to finish, failing on a non-OK exit status.
    async fn wait_for_task(&self, node: &str, upid: &str) -> Result<()> {
        loop {
            let status: TaskStatus = self
                .get(&format!(
                    "/nodes/{}/tasks/{}/status",
                    node,
                    // UPIDs contain colons; they are path-safe in PVE
                    // but not query-safe.
                    upid
                ))
                .await?;

            if status.status != "running" {
                let exit = status.exitstatus.unwrap_or_default();
                if exit == "OK" {
                    return Ok(());
                }
                return Err(ProxmoxError::TaskFailed {
                    upid: upid.to_string(),
                    status: exit,
                });
            }

            tokio::time::sleep(TASK_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl VmApi for ProxmoxClient {
    async fn version(&self) -> Result<String> {
        let version: VersionInfo = self.get("/version").await?;
        Ok(version.version)
    }

    async fn vm_status(&self, node: &str, vmid: u32) -> Result<Option<String>> {
        let vms: Vec<VmListItem> = self.get(&format!("/nodes/{}/qemu", node)).await?;
        Ok(vms
            .into_iter()
            .find(|vm| vm.vmid == vmid)
            .map(|vm| vm.status))
    }

    async fn clone_vm(&self, node: &str, template_vmid: u32, vmid: u32, name: &str) -> Result<()> {
        let form = vec![
            ("newid".to_string(), vmid.to_string()),
            ("name".to_string(), name.to_string()),
            // Full clone: the VM must not share base volumes with the
            // template.
            ("full".to_string(), "1".to_string()),
        ];

        let upid: String = self
            .post(&format!("/nodes/{}/qemu/{}/clone", node, template_vmid), &form)
            .await
            .map_err(|err| match err {
                ProxmoxError::Api { status: 500, message }
                    if message.contains("does not exist") =>
                {
                    ProxmoxError::TemplateNotFound {
                        node: node.to_string(),
                        template: template_vmid,
                    }
                }
                other => other,
            })?;

        self.wait_for_task(node, &upid).await
    }

    async fn configure_vm(&self, node: &str, vmid: u32, params: &[(String, String)]) -> Result<()> {
        // POSTing config is asynchronous and may return a UPID, for
        // example while volumes from allocating keys (efidisk0,
        // scsi1, ide2) are being created. Wait it out so resize and
        // start never race a still-applying config.
        let upid: Option<String> = self
            .post(&format!("/nodes/{}/qemu/{}/config", node, vmid), params)
            .await?;

        if let Some(upid) = upid {
            self.wait_for_task(node, &upid).await?;
        }
        Ok(())
    }

    async fn resize_disk(&self, node: &str, vmid: u32, disk: &str, size_gb: u32) -> Result<()> {
        let form = vec![
            ("disk".to_string(), disk.to_string()),
            ("size".to_string(), format!("{}G", size_gb)),
        ];

        // Returns a UPID on storage backends that resize
        // asynchronously, null otherwise.
        let upid: Option<String> = self
            .put(&format!("/nodes/{}/qemu/{}/resize", node, vmid), &form)
            .await?;

        if let Some(upid) = upid {
            self.wait_for_task(node, &upid).await?;
        }
        Ok(())
    }

    async fn start_vm(&self, node: &str, vmid: u32) -> Result<()> {
        let form: Vec<(String, String)> = Vec::new();
        let upid: String = self
            .post(&format!("/nodes/{}/qemu/{}/status/start", node, vmid), &form)
            .await?;
        self.wait_for_task(node, &upid).await
    }

    async fn agent_interfaces(&self, node: &str, vmid: u32) -> Result<Option<Vec<Vec<String>>>> {
        let result: Result<AgentNetworkInfo> = self
            .get(&format!(
                "/nodes/{}/qemu/{}/agent/network-get-interfaces",
                node, vmid
            ))
            .await;

        match result {
            Ok(info) => Ok(Some(
                info.result
                    .into_iter()
                    .map(|iface| {
                        iface
                            .ip_addresses
                            .unwrap_or_default()
                            .into_iter()
                            .filter(|addr| addr.ip_address_type == "ipv4")
                            .map(|addr| addr.ip_address)
                            .collect()
                    })
                    .collect(),
            )),
            // The agent endpoint answers 500 until the guest agent has
            // checked in after boot.
            Err(ProxmoxError::Api { status: 500, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

// ============ API types ============

/// Every `/api2/json` response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
}

/// Entry of the `/nodes/{node}/qemu` listing.
#[derive(Debug, Deserialize)]
struct VmListItem {
    vmid: u32,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,
    exitstatus: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentNetworkInfo {
    #[serde(default)]
    result: Vec<AgentInterface>,
}

#[derive(Debug, Deserialize)]
struct AgentInterface {
    #[serde(rename = "ip-addresses")]
    ip_addresses: Option<Vec<AgentIpAddress>>,
}

#[derive(Debug, Deserialize)]
struct AgentIpAddress {
    #[serde(rename = "ip-address")]
    ip_address: String,
    #[serde(rename = "ip-address-type")]
    ip_address_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_response_upid_is_bound_for_waiting() {
        // The config endpoint answers with a UPID when it kicked off
        // a task (volume allocation) and null when it applied
        // synchronously; both shapes must deserialize so the task
        // gets waited on whenever there is one.
        let busy: ApiResponse<Option<String>> = serde_json::from_value(serde_json::json!({
            "data": "UPID:m0x-01:0004F2A1:0B3C6D2E:66D0A1B2:qmconfig:200:root@pam!icefloe:"
        }))
        .unwrap();
        assert!(busy.data.unwrap().starts_with("UPID:"));

        let done: ApiResponse<Option<String>> =
            serde_json::from_value(serde_json::json!({ "data": null })).unwrap();
        assert!(done.data.is_none());
    }

    #[test]
    fn agent_report_parses_ipv4_per_interface() {
        let raw = serde_json::json!({
            "result": [
                {
                    "name": "lo",
                    "ip-addresses": [
                        {"ip-address": "127.0.0.1", "ip-address-type": "ipv4"},
                        {"ip-address": "::1", "ip-address-type": "ipv6"}
                    ]
                },
                {
                    "name": "eth0",
                    "ip-addresses": [
                        {"ip-address": "fe80::1", "ip-address-type": "ipv6"},
                        {"ip-address": "10.0.0.5", "ip-address-type": "ipv4"}
                    ]
                },
                {"name": "docker0"}
            ]
        });

        let info: AgentNetworkInfo = serde_json::from_value(raw).unwrap();
        let report: Vec<Vec<String>> = info
            .result
            .into_iter()
            .map(|iface| {
                iface
                    .ip_addresses
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|addr| addr.ip_address_type == "ipv4")
                    .map(|addr| addr.ip_address)
                    .collect()
            })
            .collect();

        assert_eq!(
            report,
            vec![
                vec!["127.0.0.1".to_string()],
                vec!["10.0.0.5".to_string()],
                Vec::new(),
            ]
        );
    }
}
