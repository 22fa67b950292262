//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! builder / signer / client / pipeline
//!     → tracing events (structured fields: sender, nonce, tx_id, method)
//!     → logging.rs subscriber (env filter, fmt layer on stderr)
//! ```
//!
//! Private keys and signer secrets are never recorded.

pub mod logging;

pub use logging::init_logging;
