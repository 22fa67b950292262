//! Configuration management.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize, defaults for missing fields)
//!     → environment overrides (ETHTX_NODE_ADDR, ETHTX_SIGN_ADDR, ETHTX_ADDR)
//!     → per-call overrides (command-line flags)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, passed by value to the clients)
//! ```
//!
//! Nothing is persisted; every invocation builds its configuration afresh.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_with, ConfigError};
pub use schema::ClientConfig;
pub use validation::{validate_config, ValidationError};
