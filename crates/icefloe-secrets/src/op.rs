//! 1Password CLI boundary
//!
//! Wraps `op item get` behind the [`SecretStore`] capability so the
//! verification pass can run against a fake in tests. Exit code 1
//! from `op` means "item not found", which is not an error here.

use crate::error::{Result, SecretsError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Outcome of a single existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCheck {
    Exists,
    NotFound,
    /// The `op` binary is not on PATH; nothing can be checked.
    ToolUnavailable,
}

/// Secrets tool boundary: "given a vault and title, does the item
/// exist?"
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn check(&self, vault: &str, title: &str) -> Result<ItemCheck>;
}

/// The real 1Password CLI.
#[derive(Debug, Default, Clone)]
pub struct OpCli;

impl OpCli {
    pub fn new() -> Self {
        Self
    }

    async fn available(&self) -> bool {
        Command::new("op")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl SecretStore for OpCli {
    async fn check(&self, vault: &str, title: &str) -> Result<ItemCheck> {
        if !self.available().await {
            return Ok(ItemCheck::ToolUnavailable);
        }

        tracing::debug!(%vault, %title, "op item get");

        let output = Command::new("op")
            .args(["item", "get", title, "--vault", vault, "--format", "json"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            return Ok(ItemCheck::Exists);
        }

        // Exit code 1 means "not found".
        if output.status.code() == Some(1) {
            return Ok(ItemCheck::NotFound);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SecretsError::CommandFailed(stderr.trim().to_string()))
    }
}
