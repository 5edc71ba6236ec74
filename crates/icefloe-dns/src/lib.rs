//! Google Cloud DNS provider for icefloe
//!
//! Creates A records in a managed zone pointing the Antarctica
//! service subdomains (forgejo, woodpecker, ...) at the VM's resolved
//! IP address. Record creation tolerates an address that is not yet
//! known: the record is written with no address data and filled in on
//! the next run.

pub mod error;
pub mod fanout;
pub mod gcp;
pub mod record;

// Re-exports
pub use error::{DnsError, Result};
pub use fanout::ensure_service_records;
pub use gcp::{CloudDns, DnsApi, DnsSettings, RecordSet};
pub use record::{service_records, RecordSpec, RECORD_TTL};
