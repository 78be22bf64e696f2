mod types;

pub use types::{Config, DataApiConfig, DatabaseConfig, OutputConfig};

use crate::error::{RelgraphError, Result};
use std::fs;
use std::path::Path;

/// Prefix of environment variables that override file settings,
/// e.g. `RELGRAPH__DATABASE__REGION`
pub const ENV_PREFIX: &str = "RELGRAPH";

/// Load configuration from a TOML file, applying environment overrides
pub fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).is_file() {
        return Err(RelgraphError::Config(format!(
            "Config file '{}' not found",
            path
        )));
    }

    let settings = ::config::Config::builder()
        .add_source(::config::File::new(path, ::config::FileFormat::Toml))
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate().map_err(RelgraphError::Config)?;

    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &Config, path: &str) -> Result<()> {
    config.validate().map_err(RelgraphError::Config)?;

    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string)
        .map_err(|e| RelgraphError::Config(format!("Failed to write config file '{}': {}", path, e)))?;

    Ok(())
}
