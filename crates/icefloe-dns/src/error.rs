//! DNS provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("{0} is not set. Export a Cloud DNS-scoped OAuth token (gcloud auth print-access-token)")]
    MissingEnvVar(String),

    #[error("Cloud DNS API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("creating DNS record for {fqdn}: {source}")]
    RecordFailed {
        fqdn: String,
        #[source]
        source: Box<DnsError>,
    },

    #[error("VM address never resolved: {0}")]
    AddressUnresolved(icefloe_engine::ResolveError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DnsError {
    /// Wrap a provider failure with the fully-qualified record name
    /// it concerns.
    pub fn record(fqdn: impl Into<String>, source: DnsError) -> Self {
        DnsError::RecordFailed {
            fqdn: fqdn.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, DnsError>;
