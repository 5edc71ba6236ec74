//! Google Cloud DNS API client
//!
//! Direct REST implementation against the `dns.googleapis.com` v1
//! `rrsets` API, keyed by record name and type so create/update is
//! idempotent per subdomain. Uses a Bearer token from the
//! environment; credentials never live in the stack config.

use crate::error::{DnsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const CLOUD_DNS_API_BASE: &str = "https://dns.googleapis.com/dns/v1";

/// Environment variable holding the OAuth access token.
pub const TOKEN_ENV: &str = "GCP_ACCESS_TOKEN";

/// Where the records live. The DNS fan-out only runs when the
/// operator configured both the managed zone and the base domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSettings {
    /// GCP project owning the managed zone.
    pub project: String,
    /// Managed zone name (e.g. "dev-nerds-run").
    pub managed_zone: String,
    /// Base domain (e.g. "dev.nerds.run").
    pub domain: String,
}

/// One resource record set, the unit of create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Fully-qualified, dot-terminated name.
    pub name: String,

    #[serde(rename = "type")]
    pub record_type: String,

    pub ttl: u32,

    /// Record data; empty for a declared-but-unresolved A record.
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

/// DNS provider boundary, fakeable for tests.
#[async_trait]
pub trait DnsApi: Send + Sync {
    async fn get_record(&self, name: &str, record_type: &str) -> Result<Option<RecordSet>>;
    async fn create_record(&self, record: &RecordSet) -> Result<()>;
    async fn patch_record(&self, record: &RecordSet) -> Result<()>;
}

/// HTTP client for one managed zone.
pub struct CloudDns {
    http: reqwest::Client,
    token: String,
    rrsets_url: String,
}

impl CloudDns {
    /// Build a client for `settings`, reading the access token from
    /// [`TOKEN_ENV`].
    pub fn from_env(settings: &DnsSettings) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| DnsError::MissingEnvVar(TOKEN_ENV.to_string()))?;
        Ok(Self::new(settings, &token))
    }

    pub fn new(settings: &DnsSettings, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            rrsets_url: format!(
                "{}/projects/{}/managedZones/{}/rrsets",
                CLOUD_DNS_API_BASE, settings.project, settings.managed_zone
            ),
        }
    }

    fn record_url(&self, name: &str, record_type: &str) -> String {
        format!("{}/{}/{}", self.rrsets_url, name, record_type)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        Err(DnsError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DnsApi for CloudDns {
    async fn get_record(&self, name: &str, record_type: &str) -> Result<Option<RecordSet>> {
        let response = self
            .http
            .get(self.record_url(name, record_type))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let record: RecordSet = Self::check(response).await?.json().await?;
        Ok(Some(record))
    }

    async fn create_record(&self, record: &RecordSet) -> Result<()> {
        tracing::info!(name = %record.name, rrdatas = ?record.rrdatas, "creating DNS record");

        let response = self
            .http
            .post(&self.rrsets_url)
            .bearer_auth(&self.token)
            .json(record)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn patch_record(&self, record: &RecordSet) -> Result<()> {
        tracing::info!(name = %record.name, rrdatas = ?record.rrdatas, "updating DNS record");

        let response = self
            .http
            .patch(self.record_url(&record.name, &record.record_type))
            .bearer_auth(&self.token)
            .json(record)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

// ============ API types ============

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_set_serializes_for_the_rrsets_api() {
        let record = RecordSet {
            name: "forgejo.dev.nerds.run.".into(),
            record_type: "A".into(),
            ttl: 300,
            rrdatas: vec!["10.0.0.5".into()],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "forgejo.dev.nerds.run.",
                "type": "A",
                "ttl": 300,
                "rrdatas": ["10.0.0.5"],
            })
        );
    }

    #[test]
    fn error_envelope_message_is_extracted() {
        let body = r#"{"error": {"code": 409, "message": "already exists"}}"#;
        let envelope: ApiErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.message, "already exists");
    }
}
