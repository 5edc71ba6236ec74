//! icefloe deployment engine primitives
//!
//! This crate provides the two building blocks every icefloe provider
//! shares:
//!
//! - [`Output`]: a single-resolution asynchronous value. A provider
//!   creates an output for an attribute that only becomes known after
//!   a resource exists (for example the IPv4 address reported by the
//!   QEMU guest agent) and downstream consumers register
//!   continuations on it instead of blocking.
//! - [`StackOutputs`]: the ordered registry of values published for
//!   downstream tooling (the Ansible inventory reads the settled
//!   JSON file).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 icefloe CLI                  │
//! │              (icefloe up/check)              │
//! └───────────────────┬──────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────┐
//! │               icefloe-engine                 │
//! │   Output<T> futures · stack output registry  │
//! └───────┬──────────────────────┬───────────────┘
//!         │                      │
//! ┌───────▼───────┐      ┌───────▼───────┐
//! │ proxmox       │      │ gcp cloud dns │
//! │ provider      │      │ provider      │
//! └───────────────┘      └───────────────┘
//! ```

pub mod error;
pub mod output;
pub mod stack;

// Re-exports
pub use error::{EngineError, ResolveError, Result};
pub use output::{Output, Resolver};
pub use stack::{OutputRecord, SettledOutputs, StackOutputs};
