//! Stack output registry
//!
//! Collects the values a deployment publishes for downstream tooling
//! and persists them to `.icefloe/outputs.json` once every deferred
//! value has settled. The Ansible dynamic inventory reads that file.

use crate::error::{EngineError, Result};
use crate::output::Output;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const OUTPUTS_DIR: &str = ".icefloe";
const OUTPUTS_FILE: &str = "outputs.json";

/// Registry of values to publish for one deployment run.
///
/// Outputs may be registered while still unresolved (as an
/// [`Output`]); consumers holding the registry can observe the
/// pending future before it settles. [`StackOutputs::settle`] waits
/// for the stragglers and produces the serializable snapshot.
#[derive(Default)]
pub struct StackOutputs {
    entries: Vec<Entry>,
}

struct Entry {
    name: String,
    value: Value,
    secret: bool,
}

enum Value {
    Ready(serde_json::Value),
    Deferred(Output<String>),
}

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an immediately known value.
    pub fn export(&mut self, name: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.push(name.into(), Value::Ready(value), false)
    }

    /// Publish a value that must be redacted when displayed.
    pub fn export_secret(&mut self, name: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.push(name.into(), Value::Ready(value), true)
    }

    /// Publish a string value that may still be resolving.
    pub fn export_deferred(&mut self, name: impl Into<String>, output: Output<String>) -> Result<()> {
        self.push(name.into(), Value::Deferred(output), false)
    }

    fn push(&mut self, name: String, value: Value, secret: bool) -> Result<()> {
        if self.entries.iter().any(|e| e.name == name) {
            return Err(EngineError::DuplicateOutput(name));
        }
        self.entries.push(Entry { name, value, secret });
        Ok(())
    }

    /// Wait for every deferred output and snapshot the registry.
    pub async fn settle(self) -> Result<SettledOutputs> {
        let mut outputs = BTreeMap::new();
        for entry in self.entries {
            let value = match entry.value {
                Value::Ready(v) => v,
                Value::Deferred(out) => {
                    let resolved = out.wait().await.map_err(|source| EngineError::Unresolved {
                        name: entry.name.clone(),
                        source,
                    })?;
                    serde_json::Value::String(resolved)
                }
            };
            outputs.insert(
                entry.name,
                OutputRecord {
                    value,
                    secret: entry.secret,
                },
            );
        }

        Ok(SettledOutputs {
            generated_at: Utc::now(),
            outputs,
        })
    }
}

/// A single published output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub value: serde_json::Value,

    /// Secret outputs are written to disk but redacted on display.
    #[serde(default)]
    pub secret: bool,
}

/// Snapshot of all outputs after every deferred value settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledOutputs {
    pub generated_at: DateTime<Utc>,
    pub outputs: BTreeMap<String, OutputRecord>,
}

impl SettledOutputs {
    /// Path of the outputs file under `root`.
    pub fn path_under(root: &Path) -> PathBuf {
        root.join(OUTPUTS_DIR).join(OUTPUTS_FILE)
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.outputs.get(name).map(|record| &record.value)
    }

    /// Write the outputs file, creating `.icefloe/` if needed.
    pub async fn write_under(&self, root: &Path) -> Result<()> {
        let path = Self::path_under(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "wrote stack outputs");
        Ok(())
    }

    pub async fn read_under(root: &Path) -> Result<Self> {
        let path = Self::path_under(root);
        let raw = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The value to show a human: secrets come back as `[secret]`.
    pub fn display_value(&self, name: &str) -> Option<String> {
        self.outputs.get(name).map(|record| {
            if record.secret {
                "[secret]".to_string()
            } else {
                match &record.value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settle_waits_for_deferred_outputs() {
        let mut outputs = StackOutputs::new();
        outputs.export("vm_hostname", "antarctica").unwrap();

        let (ip, resolver) = Output::pending();
        outputs.export_deferred("vm_ip", ip).unwrap();

        resolver.resolve("10.0.0.5".to_string());
        let settled = outputs.settle().await.unwrap();

        assert_eq!(
            settled.get("vm_ip"),
            Some(&serde_json::json!("10.0.0.5"))
        );
        assert_eq!(
            settled.get("vm_hostname"),
            Some(&serde_json::json!("antarctica"))
        );
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let mut outputs = StackOutputs::new();
        outputs.export("ssh_port", 22).unwrap();
        let err = outputs.export("ssh_port", 2222).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateOutput(_)));
    }

    #[tokio::test]
    async fn secrets_are_redacted_on_display_but_persisted() {
        let mut outputs = StackOutputs::new();
        outputs
            .export_secret("secrets_manifest", "{\"items\":[]}")
            .unwrap();

        let settled = outputs.settle().await.unwrap();
        assert_eq!(
            settled.display_value("secrets_manifest").as_deref(),
            Some("[secret]")
        );
        assert_eq!(
            settled.get("secrets_manifest"),
            Some(&serde_json::json!("{\"items\":[]}"))
        );
    }

    #[tokio::test]
    async fn outputs_round_trip_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut outputs = StackOutputs::new();
        outputs.export("firewall_ports", vec![22, 80, 443]).unwrap();

        let settled = outputs.settle().await.unwrap();
        settled.write_under(dir.path()).await.unwrap();

        let read = SettledOutputs::read_under(dir.path()).await.unwrap();
        assert_eq!(
            read.get("firewall_ports"),
            Some(&serde_json::json!([22, 80, 443]))
        );
    }
}
