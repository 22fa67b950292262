//! Build, sign and submit account-model transactions through a remote node
//! and an external signing daemon.

pub mod blockchain;
pub mod config;
pub mod observability;

pub use blockchain::{RpcClient, SignerClient, Transaction, TxBuilder, TxPipeline};
pub use config::ClientConfig;
