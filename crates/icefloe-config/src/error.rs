use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "no stack config found. Checked:\n\
        - the ICEFLOE_CONFIG environment variable\n\
        - ./icefloe.yaml, ./icefloe.yml\n\
        - ./.icefloe/icefloe.yaml\n\
        - ~/.config/icefloe/icefloe.yaml"
    )]
    StackFileNotFound,

    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
