//! Manifest verification.
//!
//! Checks every manifest item against the secrets tool and logs
//! actionable guidance for whatever is missing. All outcomes are
//! non-fatal: the deployment provisions infrastructure whether or not
//! the secrets exist yet.

use crate::manifest::SecretItem;
use crate::op::{ItemCheck, SecretStore};

/// What the verification pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub present: Vec<String>,
    pub missing: Vec<String>,
    pub errored: Vec<String>,
    pub tool_unavailable: bool,
}

impl VerifyReport {
    pub fn all_present(&self) -> bool {
        !self.tool_unavailable && self.missing.is_empty() && self.errored.is_empty()
    }
}

/// Check each item in `items` and warn about anything missing.
///
/// Never returns an error: degraded-mode conditions (tool missing,
/// item not found, unexpected per-item tool failure) produce exactly
/// one warning each and the run continues.
pub async fn verify_manifest(store: &dyn SecretStore, items: &[SecretItem]) -> VerifyReport {
    let mut report = VerifyReport::default();

    for item in items {
        match store.check(&item.vault, &item.title).await {
            Ok(ItemCheck::Exists) => {
                tracing::info!(
                    title = %item.title,
                    vault = %item.vault,
                    "1Password item exists"
                );
                report.present.push(item.title.clone());
            }
            Ok(ItemCheck::NotFound) => {
                tracing::warn!("{}", missing_item_message(item));
                report.missing.push(item.title.clone());
            }
            Ok(ItemCheck::ToolUnavailable) => {
                tracing::warn!(
                    "1Password CLI (op) not found in PATH. Skipping secret verification; ensure items exist manually."
                );
                report.tool_unavailable = true;
                return report;
            }
            Err(err) => {
                tracing::warn!(
                    title = %item.title,
                    "could not check 1Password item: {err}"
                );
                report.errored.push(item.title.clone());
            }
        }
    }

    report
}

/// The single warning emitted per missing item, carrying a command
/// the operator can paste to create it.
fn missing_item_message(item: &SecretItem) -> String {
    format!(
        "1Password item \"{}\" NOT found in vault \"{}\". Create it with:\n  {}",
        item.title,
        item.vault,
        item.create_command()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SecretsError};
    use crate::manifest::manifest;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct FakeStore {
        outcomes: BTreeMap<String, ItemCheck>,
        fail_titles: Vec<String>,
    }

    impl FakeStore {
        fn with_all(outcome: ItemCheck) -> Self {
            Self {
                outcomes: manifest()
                    .into_iter()
                    .map(|item| (item.title, outcome))
                    .collect(),
                fail_titles: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SecretStore for FakeStore {
        async fn check(&self, _vault: &str, title: &str) -> Result<ItemCheck> {
            if self.fail_titles.iter().any(|t| t == title) {
                return Err(SecretsError::CommandFailed("session expired".into()));
            }
            Ok(*self.outcomes.get(title).unwrap_or(&ItemCheck::NotFound))
        }
    }

    #[tokio::test]
    async fn all_present_when_every_item_exists() {
        let store = FakeStore::with_all(ItemCheck::Exists);
        let report = verify_manifest(&store, &manifest()).await;
        assert!(report.all_present());
        assert_eq!(report.present.len(), 3);
    }

    #[tokio::test]
    async fn missing_items_never_abort() {
        let store = FakeStore::with_all(ItemCheck::NotFound);
        let report = verify_manifest(&store, &manifest()).await;
        assert_eq!(report.missing.len(), 3);
        assert!(!report.all_present());
    }

    #[test]
    fn missing_item_warning_carries_a_runnable_create_command() {
        for item in manifest() {
            let message = missing_item_message(&item);
            assert!(message.contains(&item.title));
            assert!(message.contains(&item.create_command()));
            assert!(message.contains("op item create --category"));
        }
    }

    #[tokio::test]
    async fn unavailable_tool_short_circuits_without_failing() {
        let store = FakeStore::with_all(ItemCheck::ToolUnavailable);
        let report = verify_manifest(&store, &manifest()).await;
        assert!(report.tool_unavailable);
        assert!(report.present.is_empty());
        assert!(report.missing.is_empty());
    }

    #[tokio::test]
    async fn per_item_tool_errors_are_collected_not_raised() {
        let mut store = FakeStore::with_all(ItemCheck::Exists);
        store.fail_titles.push("antarctica_forgejo".to_string());

        let report = verify_manifest(&store, &manifest()).await;
        assert_eq!(report.errored, vec!["antarctica_forgejo".to_string()]);
        assert_eq!(report.present.len(), 2);
    }
}
