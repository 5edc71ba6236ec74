//! The deployment run: provision, then fan out.
//!
//! Order matters only where the dependency graph demands it: the VM
//! is created first, its address output is registered (still
//! pending under DHCP) in the export fan-out, the DNS fan-out then
//! waits for the address, and the secrets check runs last because it
//! shares nothing with the rest. DNS and compute failures abort the
//! run; secrets problems only warn.

use anyhow::{Context, Result};
use icefloe_config::StackConfig;
use icefloe_dns::{ensure_service_records, DnsApi, DnsSettings};
use icefloe_engine::{SettledOutputs, StackOutputs};
use icefloe_proxmox::{split_ssh_keys, Provisioner, VmApi, VmSpec};
use icefloe_secrets::{manifest, manifest_json, verify_manifest, SecretStore};

use crate::{network, storage};

/// Build the immutable compute descriptor from the stack config.
pub fn vm_spec(config: &StackConfig) -> VmSpec {
    VmSpec {
        node: config.node.clone(),
        vm_id: config.vm_id,
        template_vm_id: config.template_vm_id,
        hostname: config.hostname.clone(),
        cpu_cores: config.cpu_cores,
        memory_mb: config.memory_mb,
        boot_disk_gb: config.boot_disk_gb,
        data_disk_gb: config.data_disk_gb,
        storage_pool: config.storage_pool.clone(),
        network_bridge: config.network_bridge.clone(),
        ip_address: config.ip_address.clone(),
        gateway: config.gateway.clone(),
        nameserver: config.nameserver.clone(),
        search_domain: if config.dns_domain.is_empty() {
            None
        } else {
            Some(config.dns_domain.clone())
        },
        ssh_user: config.ssh_user.clone(),
        ssh_public_keys: split_ssh_keys(&config.ssh_public_keys),
    }
}

/// The single optional-DNS guard: record management happens only when
/// the operator configured both the managed zone and the base domain.
pub fn dns_settings(config: &StackConfig) -> Result<Option<DnsSettings>> {
    if !config.dns_enabled() {
        return Ok(None);
    }
    if config.gcp_project.is_empty() {
        anyhow::bail!("gcp_project must be set when gcp_dns_zone and dns_domain are configured");
    }
    Ok(Some(DnsSettings {
        project: config.gcp_project.clone(),
        managed_zone: config.gcp_dns_zone.clone(),
        domain: config.dns_domain.clone(),
    }))
}

/// Provision the VM and run the dependent-resource fan-outs.
///
/// The DNS fan-out runs on the settings [`dns_settings`] produced,
/// paired with the client built from them.
pub async fn run<A: VmApi + 'static>(
    config: &StackConfig,
    provisioner: &Provisioner<A>,
    dns: Option<(&dyn DnsApi, &DnsSettings)>,
    secrets: &dyn SecretStore,
) -> Result<SettledOutputs> {
    let spec = vm_spec(config);
    tracing::info!(
        vm = %spec.ident(),
        template = %config.cloud_init_template,
        template_vm_id = spec.template_vm_id,
        "ensuring VM"
    );

    let handle = provisioner.ensure(&spec).await?;

    // Export fan-out: unconditional, and observable before the
    // address resolves.
    let mut outputs = StackOutputs::new();
    network::export(&mut outputs, config, handle.ip.clone())?;
    storage::export(&mut outputs, config.data_disk_gb)?;
    outputs.export_secret("secrets_manifest", manifest_json()?)?;

    // DNS fan-out: gated on the optional settings, waits for the
    // address, tolerates the empty sentinel.
    if let Some((dns_api, settings)) = dns {
        let ensured =
            ensure_service_records(dns_api, &settings.domain, handle.ip.clone()).await?;
        tracing::info!(records = ensured.len(), "service DNS records ensured");
    }

    // Secrets verification: shares nothing with the fan-outs above
    // and never fails the run.
    verify_manifest(secrets, &manifest()).await;

    outputs
        .settle()
        .await
        .context("collecting stack outputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use icefloe_dns::RecordSet;
    use icefloe_proxmox::{AgentPollPolicy, Result as PveResult};
    use icefloe_secrets::{ItemCheck, Result as SecretsResult};
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeVm {
        report: Vec<Vec<String>>,
    }

    #[async_trait]
    impl VmApi for FakeVm {
        async fn version(&self) -> PveResult<String> {
            Ok("8.2".to_string())
        }
        async fn vm_status(&self, _: &str, _: u32) -> PveResult<Option<String>> {
            Ok(None)
        }
        async fn clone_vm(&self, _: &str, _: u32, _: u32, _: &str) -> PveResult<()> {
            Ok(())
        }
        async fn configure_vm(&self, _: &str, _: u32, _: &[(String, String)]) -> PveResult<()> {
            Ok(())
        }
        async fn resize_disk(&self, _: &str, _: u32, _: &str, _: u32) -> PveResult<()> {
            Ok(())
        }
        async fn start_vm(&self, _: &str, _: u32) -> PveResult<()> {
            Ok(())
        }
        async fn agent_interfaces(&self, _: &str, _: u32) -> PveResult<Option<Vec<Vec<String>>>> {
            Ok(Some(self.report.clone()))
        }
    }

    #[derive(Default)]
    struct FakeZone {
        records: Mutex<BTreeMap<String, RecordSet>>,
    }

    #[async_trait]
    impl DnsApi for FakeZone {
        async fn get_record(
            &self,
            name: &str,
            _record_type: &str,
        ) -> icefloe_dns::Result<Option<RecordSet>> {
            Ok(self.records.lock().unwrap().get(name).cloned())
        }
        async fn create_record(&self, record: &RecordSet) -> icefloe_dns::Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.name.clone(), record.clone());
            Ok(())
        }
        async fn patch_record(&self, record: &RecordSet) -> icefloe_dns::Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.name.clone(), record.clone());
            Ok(())
        }
    }

    struct AllMissing;

    #[async_trait]
    impl SecretStore for AllMissing {
        async fn check(&self, _: &str, _: &str) -> SecretsResult<ItemCheck> {
            Ok(ItemCheck::NotFound)
        }
    }

    fn dhcp_dns_config() -> StackConfig {
        let mut config: StackConfig = serde_yaml::from_str(
            "api_url: https://pve.example:8006\nnode: m0x-01\ntemplate_vm_id: 9000\n",
        )
        .unwrap();
        config.gcp_project = "nerds-run".into();
        config.gcp_dns_zone = "dev-nerds-run".into();
        config.dns_domain = "dev.nerds.run".into();
        config.ssh_public_keys = "keyA\nkeyB\n\n".into();
        config
    }

    #[test]
    fn vm_spec_splits_keys_and_carries_the_search_domain() {
        let spec = vm_spec(&dhcp_dns_config());
        assert_eq!(spec.ssh_public_keys, vec!["keyA", "keyB"]);
        assert_eq!(spec.search_domain.as_deref(), Some("dev.nerds.run"));
        assert_eq!(spec.hostname, "antarctica");
    }

    #[test]
    fn dns_guard_is_all_or_nothing() {
        let mut config = dhcp_dns_config();
        assert!(dns_settings(&config).unwrap().is_some());

        config.dns_domain.clear();
        assert!(dns_settings(&config).unwrap().is_none());

        config.dns_domain = "dev.nerds.run".into();
        config.gcp_project.clear();
        assert!(dns_settings(&config).is_err());
    }

    /// DHCP config plus a guest report of 10.0.0.5 publishes
    /// vm_ip = 10.0.0.5 and six A records targeting it.
    #[tokio::test]
    async fn deferred_address_flows_into_outputs_and_dns() {
        let config = dhcp_dns_config();
        let provisioner = Provisioner::new(FakeVm {
            report: vec![vec!["127.0.0.1".to_string()], vec!["10.0.0.5".to_string()]],
        })
        .with_poll_policy(AgentPollPolicy {
            attempts: 3,
            interval: Duration::from_millis(1),
        });
        let zone = FakeZone::default();
        let settings = dns_settings(&config).unwrap().unwrap();

        let outputs = run(&config, &provisioner, Some((&zone, &settings)), &AllMissing)
            .await
            .unwrap();

        assert_eq!(outputs.get("vm_ip"), Some(&serde_json::json!("10.0.0.5")));
        assert_eq!(
            outputs.get("vm_hostname"),
            Some(&serde_json::json!("antarctica"))
        );
        assert_eq!(
            outputs.get("firewall_ports"),
            Some(&serde_json::json!([22, 80, 443, 2222, 5000, 9090]))
        );

        let records = zone.records.lock().unwrap();
        assert_eq!(records.len(), 6);
        assert!(records
            .values()
            .all(|r| r.rrdatas == vec!["10.0.0.5".to_string()] && r.record_type == "A"));
        // Records land under the guard's domain, not some other
        // reading of the config.
        assert!(records
            .keys()
            .all(|name| name.ends_with(&format!("{}.", settings.domain))));
    }

    #[tokio::test]
    async fn run_without_dns_still_publishes_everything() {
        let mut config = dhcp_dns_config();
        config.gcp_dns_zone.clear();
        config.dns_domain.clear();

        let provisioner = Provisioner::new(FakeVm { report: Vec::new() })
            .with_poll_policy(AgentPollPolicy {
                attempts: 1,
                interval: Duration::from_millis(1),
            });

        let outputs = run(&config, &provisioner, None, &AllMissing).await.unwrap();

        // Empty report resolves the exported address to the empty
        // sentinel, not an error.
        assert_eq!(outputs.get("vm_ip"), Some(&serde_json::json!("")));
        assert_eq!(
            outputs.get("data_paths"),
            Some(&serde_json::json!([
                "/data/containers",
                "/data/forgejo",
                "/data/woodpecker",
                "/data/registry",
                "/data/postgresql",
                "/data/libvirt",
                "/data/docker",
            ]))
        );
        assert_eq!(
            outputs.display_value("secrets_manifest").as_deref(),
            Some("[secret]")
        );
    }
}
