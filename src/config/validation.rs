//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: ClientConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::blockchain::coerce::parse_address;
use crate::config::schema::{with_scheme, ClientConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check endpoints, the default sender and the log level.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.node_addr.is_empty() {
        if let Err(e) = url::Url::parse(&with_scheme(&config.node_addr)) {
            errors.push(ValidationError::new("node_addr", e.to_string()));
        }
    }

    if config.sign_addr.is_empty() {
        errors.push(ValidationError::new("sign_addr", "must not be empty"));
    } else if let Err(e) = url::Url::parse(&config.sign_url()) {
        errors.push(ValidationError::new("sign_addr", e.to_string()));
    }

    if !config.addr.is_empty() {
        if let Err(e) = parse_address(&config.addr) {
            errors.push(ValidationError::new("addr", e.to_string()));
        }
    }

    if !LOG_LEVELS.contains(&config.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "log_level",
            format!("'{}' is not one of {}", config.log_level, LOG_LEVELS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let config = ClientConfig {
            node_addr: "http://[::1".to_string(),
            sign_addr: String::new(),
            addr: "0x1234".to_string(),
            log_level: "loud".to_string(),
        };
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["node_addr", "sign_addr", "addr", "log_level"]);
    }
}
