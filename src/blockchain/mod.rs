//! Transaction construction, signing and submission.
//!
//! # Data Flow
//! ```text
//! caller strings (addresses, amounts, payload)
//!     → coerce.rs      (hex / decimal → bytes, integers)
//!     → builder.rs     (validation, nonce via client.rs)
//!     → transaction.rs (canonical record, signing hash)
//!     → pipeline.rs    (sign via signer.rs, encode, broadcast via client.rs)
//! ```
//!
//! # Constraints
//! - Signing hash and wire encoding must be byte-exact
//! - No keys held here when the external signer is used
//! - No retries: every failure surfaces with the stage that produced it

pub mod builder;
pub mod client;
pub mod coerce;
pub mod pipeline;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use builder::{TxBuilder, TxParams};
pub use client::{BlockId, CallRequest, RpcClient, RpcValue};
pub use pipeline::TxPipeline;
pub use signer::{SignerClient, SigningProvider};
pub use transaction::Transaction;
pub use types::{ErrorKind, PipelineError, Stage, SubmitOptions, SubmitReport};
pub use wallet::LocalSigner;
