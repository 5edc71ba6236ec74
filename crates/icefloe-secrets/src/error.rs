//! Secrets verification error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("op command failed: {0}")]
    CommandFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SecretsError>;
