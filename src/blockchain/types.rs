//! Error taxonomy, pipeline stages and shared result types.

use alloy::primitives::{Address, Bytes};
use serde::Serialize;
use thiserror::Error;

use crate::blockchain::transaction::Transaction;

/// Broad classification of a failure, used by callers to decide whether a
/// retry is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input or missing required field. Never retried.
    InputValidation,
    /// Node or signer could not be reached.
    Transport,
    /// Node or signer answered with a structured error.
    RemoteRejection,
    /// Signature length mismatch or unsigned encoding where a signed one was required.
    Encoding,
    /// Remote answered with a body that matches no known shape.
    MalformedResponse,
}

/// Stage of the sign-and-broadcast sequence at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Build,
    Sign,
    Encode,
    Broadcast,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Build => "build",
            Stage::Sign => "sign",
            Stage::Encode => "encode",
            Stage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// Errors converting caller-supplied strings into bytes or integers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// Characters outside the expected alphabet, or a value that does not fit.
    #[error("malformed input '{input}': {reason}")]
    MalformedInput { input: String, reason: String },

    /// Address did not decode to exactly 20 bytes.
    #[error("address '{input}' decodes to {len} bytes, expected 20")]
    AddressLength { input: String, len: usize },
}

/// Errors raised by the node JSON-RPC client.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No node endpoint configured.
    #[error("no node endpoint configured")]
    NoEndpoint,

    /// Request could not be delivered or the body could not be read.
    #[error("transport error talking to node {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Node answered with an error envelope.
    #[error("node error code {code}: {message}")]
    Remote { code: i64, message: String },

    /// Body matched neither the success nor the error envelope.
    #[error("malformed node response: {0}")]
    MalformedResponse(String),

    /// Result had a different shape than the method returns.
    #[error("unexpected result for {method}: expected {expected}, got {actual}")]
    UnexpectedResult {
        method: String,
        expected: &'static str,
        actual: String,
    },

    /// Receipt did not appear within the caller's limit.
    #[error("no receipt for {tx_id} after {secs} seconds")]
    ReceiptTimeout { tx_id: String, secs: u64 },
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::NoEndpoint => ErrorKind::InputValidation,
            RpcError::Transport { .. } | RpcError::ReceiptTimeout { .. } => ErrorKind::Transport,
            RpcError::Remote { .. } => ErrorKind::RemoteRejection,
            RpcError::MalformedResponse(_) | RpcError::UnexpectedResult { .. } => {
                ErrorKind::MalformedResponse
            }
        }
    }
}

/// Errors raised by a signing provider.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Signer could not be reached.
    #[error("signer {endpoint} unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Signer answered with an HTTP error status or a non-empty `Error` field.
    #[error("signer rejected request: {0}")]
    Rejected(String),

    /// Signer answered with a body that is not the expected JSON object.
    #[error("malformed signer response: {0}")]
    MalformedResponse(String),

    /// `Response` did not decode to exactly 65 bytes.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Local key could not produce a signature.
    #[error("local signing failed: {0}")]
    Local(String),
}

impl SignerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignerError::Unreachable { .. } => ErrorKind::Transport,
            SignerError::Rejected(_) | SignerError::Local(_) => ErrorKind::RemoteRejection,
            SignerError::MalformedResponse(_) | SignerError::MalformedSignature(_) => {
                ErrorKind::MalformedResponse
            }
        }
    }
}

/// Errors in the canonical binary encoding of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("signature must be 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("transaction is not signed")]
    IncompleteSignature,

    #[error("invalid transaction encoding: {0}")]
    Decode(String),
}

impl EncodingError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Encoding
    }
}

/// Errors raised while validating inputs and assembling a transaction.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("amount: {0}")]
    InvalidAmount(#[source] CoercionError),

    #[error("gas: {0}")]
    InvalidGas(#[source] CoercionError),

    #[error("price: {0}")]
    InvalidPrice(#[source] CoercionError),

    #[error("{field}: {source}")]
    InvalidAddress {
        field: &'static str,
        #[source]
        source: CoercionError,
    },

    #[error("data: {0}")]
    InvalidData(#[source] CoercionError),

    #[error("sender address must be given")]
    MissingSender,

    #[error("destination address must be given")]
    MissingRecipient,

    #[error("contract creation takes no destination address")]
    UnexpectedRecipient,

    #[error("a nonce must be given when no node endpoint is configured")]
    NonceRequired,

    #[error("fetching account nonce: {0}")]
    NonceLookup(#[source] RpcError),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::NonceLookup(e) => e.kind(),
            _ => ErrorKind::InputValidation,
        }
    }
}

/// Failure of a sign-and-broadcast run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("sign failed: {0}")]
    Sign(#[from] SignerError),

    #[error("encode failed: {0}")]
    Encode(#[from] EncodingError),

    #[error("broadcast failed: {0}")]
    Broadcast(#[from] RpcError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Build(_) => Stage::Build,
            PipelineError::Sign(_) => Stage::Sign,
            PipelineError::Encode(_) => Stage::Encode,
            PipelineError::Broadcast(_) => Stage::Broadcast,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Build(e) => e.kind(),
            PipelineError::Sign(e) => e.kind(),
            PipelineError::Encode(e) => e.kind(),
            PipelineError::Broadcast(e) => e.kind(),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
pub type SignerResult<T> = Result<T, SignerError>;
pub type EncodingResult<T> = Result<T, EncodingError>;
pub type BuildResult<T> = Result<T, BuildError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Which optional stages a sign-and-broadcast run should perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub sign: bool,
    pub binary: bool,
    pub broadcast: bool,
}

/// Outcome of a sign-and-broadcast run.
#[derive(Debug, Clone)]
pub struct SubmitReport {
    /// The transaction as it stood after the last stage.
    pub transaction: Transaction,
    /// Raw 65-byte signature, when signed.
    pub signature: Option<[u8; 65]>,
    /// Wire encoding, when encoded.
    pub raw: Option<Bytes>,
    /// Transaction id reported by the node, when broadcast.
    pub tx_id: Option<String>,
    /// Address of the deployed contract, when a creation transaction was broadcast.
    pub contract_address: Option<Address>,
}

/// Snapshot of node state assembled from several status queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeStatus {
    pub chain: ChainStatus,
    pub net: NetStatus,
    pub mining: MiningStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainStatus {
    pub protocol_version: String,
    pub block_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetStatus {
    pub version: String,
    pub peer_count: i64,
    pub listening: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MiningStatus {
    pub mining: bool,
    pub coinbase: String,
    /// Hex quantity as reported by the node.
    pub gas_price: String,
}
