//! 1Password secrets inventory for icefloe
//!
//! There is no secrets provider in the deployment path; this crate
//! carries:
//!
//! 1. A declarative manifest of every 1Password item the Antarctica
//!    services need. Field values are descriptions of expected
//!    content; real secret material never enters this crate.
//! 2. A verification pass that shells out to the `op` CLI and reports
//!    missing items with a runnable creation command. Verification is
//!    a degraded-mode concern: a missing tool or missing item warns
//!    and never fails the run.

pub mod error;
pub mod manifest;
pub mod op;
pub mod verify;

// Re-exports
pub use error::{Result, SecretsError};
pub use manifest::{manifest, manifest_json, SecretItem};
pub use op::{ItemCheck, OpCli, SecretStore};
pub use verify::{verify_manifest, VerifyReport};
