pub mod check;
pub mod outputs;
pub mod up;

use icefloe_config::StackConfig;
use std::path::Path;

/// Load the stack config from an explicit path or by discovery.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StackConfig> {
    let config = match path {
        Some(path) => StackConfig::from_path(path)?,
        None => StackConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}
