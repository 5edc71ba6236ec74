//! Declarative manifest of required 1Password items.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single 1Password item the deployment depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretItem {
    /// Human-readable title in 1Password.
    pub title: String,
    /// 1Password vault name.
    pub vault: String,
    /// Category (e.g. "Secure Note", "Password", "Login").
    pub category: String,
    /// Field label -> description of what it holds. Actual secret
    /// values are never stored here.
    pub fields: BTreeMap<String, String>,
}

impl SecretItem {
    fn new(title: &str, vault: &str, category: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            title: title.to_string(),
            vault: vault.to_string(),
            category: category.to_string(),
            fields: fields
                .iter()
                .map(|(label, desc)| (label.to_string(), desc.to_string()))
                .collect(),
        }
    }

    /// The `op item create` command an operator can paste into a
    /// terminal with an OP session active.
    pub fn create_command(&self) -> String {
        let mut cmd = format!(
            "op item create --category \"{}\" --title \"{}\" --vault \"{}\"",
            self.category, self.title, self.vault
        );
        for label in self.fields.keys() {
            cmd.push_str(&format!(" '{}[password]='", label));
        }
        cmd
    }
}

/// The complete list of secrets required by the Antarctica services.
pub fn manifest() -> Vec<SecretItem> {
    vec![
        SecretItem::new(
            "antarctica_postgresql",
            "Infrastructure",
            "Password",
            &[(
                "password",
                "PostgreSQL superuser password for the woodpecker database",
            )],
        ),
        SecretItem::new(
            "antarctica_woodpecker",
            "Infrastructure",
            "Secure Note",
            &[
                (
                    "agent-secret",
                    "Shared secret between Woodpecker server and agents",
                ),
                ("gitea-client", "OAuth2 client ID for Forgejo integration"),
                (
                    "gitea-secret",
                    "OAuth2 client secret for Forgejo integration",
                ),
            ],
        ),
        SecretItem::new(
            "antarctica_forgejo",
            "Infrastructure",
            "Secure Note",
            &[
                ("secret-key", "Forgejo internal secret key"),
                ("internal-token", "Forgejo internal API token"),
                ("oauth2-jwt-secret", "OAuth2 JWT signing secret"),
                ("lfs-jwt-secret", "LFS JWT signing secret"),
                (
                    "action-runner-token",
                    "Gitea Actions runner registration token",
                ),
            ],
        ),
    ]
}

/// The manifest serialized for the `secrets_manifest` stack output.
/// Published secret-marked so downstream automation can cross-reference
/// which items it expects to read.
pub fn manifest_json() -> Result<String> {
    Ok(serde_json::to_string(&manifest())?)
}
