//! Conditional DNS fan-out.
//!
//! Waits for the VM's address output once, then creates or updates
//! one A record per service subdomain. An address that resolved to
//! the empty sentinel produces records with no address data rather
//! than no records at all, so declared state stays consistent and a
//! later run fills the address in. The first record failure aborts
//! the remaining fan-out; whatever was already written is idempotent
//! by name and self-heals on retry.

use crate::error::{DnsError, Result};
use crate::gcp::{DnsApi, RecordSet};
use crate::record::{service_records, RECORD_TTL};
use icefloe_engine::Output;

/// Create or update every service A record, pointing at `ip`.
///
/// Returns the fully-qualified names that were ensured, in order.
pub async fn ensure_service_records(
    api: &dyn DnsApi,
    domain: &str,
    ip: Output<String>,
) -> Result<Vec<String>> {
    let rrdatas = ip
        .then_if_non_empty(|addr| vec![addr])
        .wait()
        .await
        .map_err(DnsError::AddressUnresolved)?
        .unwrap_or_default();

    if rrdatas.is_empty() {
        tracing::warn!(
            "VM address not yet known; writing service records without address data"
        );
    }

    let mut ensured = Vec::new();
    for spec in service_records() {
        let fqdn = spec.fqdn(domain);
        let desired = RecordSet {
            name: fqdn.clone(),
            record_type: "A".to_string(),
            ttl: RECORD_TTL,
            rrdatas: rrdatas.clone(),
        };

        ensure_record(api, &desired)
            .await
            .map_err(|err| DnsError::record(&fqdn, err))?;
        ensured.push(fqdn);
    }

    Ok(ensured)
}

async fn ensure_record(api: &dyn DnsApi, desired: &RecordSet) -> Result<()> {
    match api.get_record(&desired.name, &desired.record_type).await? {
        None => api.create_record(desired).await,
        Some(existing) if existing == *desired => {
            tracing::debug!(name = %desired.name, "DNS record already up to date");
            Ok(())
        }
        Some(_) => api.patch_record(desired).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory zone keyed like the real API: name + type.
    #[derive(Default)]
    struct FakeZone {
        records: Mutex<BTreeMap<String, RecordSet>>,
        creates: Mutex<u32>,
        patches: Mutex<u32>,
        fail_on: Option<String>,
    }

    impl FakeZone {
        fn record(&self, fqdn: &str) -> Option<RecordSet> {
            self.records.lock().unwrap().get(fqdn).cloned()
        }
    }

    #[async_trait]
    impl DnsApi for FakeZone {
        async fn get_record(&self, name: &str, _record_type: &str) -> Result<Option<RecordSet>> {
            Ok(self.records.lock().unwrap().get(name).cloned())
        }

        async fn create_record(&self, record: &RecordSet) -> Result<()> {
            if self.fail_on.as_deref() == Some(record.name.as_str()) {
                return Err(DnsError::Api {
                    status: 403,
                    message: "permission denied".into(),
                });
            }
            *self.creates.lock().unwrap() += 1;
            self.records
                .lock()
                .unwrap()
                .insert(record.name.clone(), record.clone());
            Ok(())
        }

        async fn patch_record(&self, record: &RecordSet) -> Result<()> {
            *self.patches.lock().unwrap() += 1;
            self.records
                .lock()
                .unwrap()
                .insert(record.name.clone(), record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn resolved_address_writes_six_a_records() {
        let zone = FakeZone::default();
        let ensured = ensure_service_records(
            &zone,
            "dev.nerds.run",
            Output::resolved("10.0.0.5".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(ensured.len(), 6);
        let forgejo = zone.record("forgejo.dev.nerds.run.").unwrap();
        assert_eq!(forgejo.record_type, "A");
        assert_eq!(forgejo.ttl, 300);
        assert_eq!(forgejo.rrdatas, vec!["10.0.0.5".to_string()]);
    }

    #[tokio::test]
    async fn empty_address_writes_records_without_rrdatas() {
        let zone = FakeZone::default();
        ensure_service_records(&zone, "dev.nerds.run", Output::resolved(String::new()))
            .await
            .unwrap();

        let cockpit = zone.record("cockpit.dev.nerds.run.").unwrap();
        assert!(cockpit.rrdatas.is_empty());
    }

    #[tokio::test]
    async fn fanout_is_idempotent_keyed_by_name() {
        let zone = FakeZone::default();
        let ip = Output::resolved("10.0.0.5".to_string());

        ensure_service_records(&zone, "dev.nerds.run", ip.clone())
            .await
            .unwrap();
        ensure_service_records(&zone, "dev.nerds.run", ip)
            .await
            .unwrap();

        assert_eq!(zone.records.lock().unwrap().len(), 6);
        assert_eq!(*zone.creates.lock().unwrap(), 6);
        // Second run found identical records and touched nothing.
        assert_eq!(*zone.patches.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn address_change_patches_in_place() {
        let zone = FakeZone::default();
        ensure_service_records(&zone, "dev.nerds.run", Output::resolved(String::new()))
            .await
            .unwrap();
        ensure_service_records(
            &zone,
            "dev.nerds.run",
            Output::resolved("10.0.0.5".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(*zone.patches.lock().unwrap(), 6);
        let sshx = zone.record("sshx.dev.nerds.run.").unwrap();
        assert_eq!(sshx.rrdatas, vec!["10.0.0.5".to_string()]);
    }

    #[tokio::test]
    async fn first_failure_aborts_with_the_offending_fqdn() {
        let zone = FakeZone {
            fail_on: Some("sshx.dev.nerds.run.".to_string()),
            ..FakeZone::default()
        };

        let err = ensure_service_records(
            &zone,
            "dev.nerds.run",
            Output::resolved("10.0.0.5".to_string()),
        )
        .await
        .unwrap_err();

        match err {
            DnsError::RecordFailed { fqdn, .. } => {
                assert_eq!(fqdn, "sshx.dev.nerds.run.")
            }
            other => panic!("unexpected error: {other}"),
        }

        // forgejo and woodpecker precede sshx in the fixed order and
        // were already written; registry/vscode/cockpit were not.
        assert!(zone.record("woodpecker.dev.nerds.run.").is_some());
        assert!(zone.record("registry.dev.nerds.run.").is_none());
    }
}
