//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::ClientError;

/// Failure to produce a usable configuration from a file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config rejected: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Load a TOML configuration file and validate it as a whole.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(&fs::read_to_string(path)?)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
