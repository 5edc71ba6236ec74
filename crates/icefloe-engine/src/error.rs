//! Engine error types

use thiserror::Error;

/// Why an [`crate::Output`] settled without a value.
///
/// This type is `Clone` because a settled output is shared by every
/// consumer holding a handle to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("value source dropped before resolving")]
    SourceDropped,

    #[error("value source failed: {0}")]
    SourceFailed(String),
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("output \"{name}\" never resolved: {source}")]
    Unresolved {
        name: String,
        source: ResolveError,
    },

    #[error("duplicate stack output: {0}")]
    DuplicateOutput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
