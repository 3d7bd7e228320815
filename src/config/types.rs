//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use superfeed_model::{ChannelConfig, HierarchyNode};
use thiserror::Error;

use super::push::PushConfig;
use super::validation::ValidationError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Push coordinator configuration.
    #[serde(default)]
    pub push: PushConfig,
    /// Premium configuration table, keyed by channel username.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
    /// Geographic/organizational hierarchy seeding the base directory.
    #[serde(default)]
    pub hierarchy: Vec<HierarchyNode>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration and reject it if validation finds any problem.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        super::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}
