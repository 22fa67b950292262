//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const NODE_ADDR_ENV_VAR: &str = "ETHTX_NODE_ADDR";
pub const SIGN_ADDR_ENV_VAR: &str = "ETHTX_SIGN_ADDR";
pub const ADDR_ENV_VAR: &str = "ETHTX_ADDR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: file (if given) → environment overrides → validation.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    load_config_with(path, |_| {})
}

/// Like [`load_config`], with per-call `overrides` applied after the
/// environment and before validation.
pub fn load_config_with<F>(path: Option<&Path>, overrides: F) -> Result<ClientConfig, ConfigError>
where
    F: FnOnce(&mut ClientConfig),
{
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML document, filling missing fields with defaults.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Override fields from non-empty environment values.
pub fn apply_env<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = non_empty(NODE_ADDR_ENV_VAR) {
        config.node_addr = v;
    }
    if let Some(v) = non_empty(SIGN_ADDR_ENV_VAR) {
        config.sign_addr = v;
    }
    if let Some(v) = non_empty(ADDR_ENV_VAR) {
        config.addr = v;
    }
}
