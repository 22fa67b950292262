//! Sign → encode → broadcast sequencing.
//!
//! # Data Flow
//! ```text
//! Transaction
//!     → sign       (SigningProvider over signing_hash, then apply_signature)
//!     → encode     (serialize; unsigned only when binary output was asked for without signing)
//!     → broadcast  (eth_sendRawTransaction with the hex wire bytes)
//!     → SubmitReport
//! ```
//!
//! Each stage is optional and runs at most once. The first failure ends the
//! run and is returned tagged with its stage; nothing is retried. Re-broadcasting
//! the same bytes is safe, signing a second payload with the same nonce is not.

use alloy::primitives::Bytes;

use crate::blockchain::client::RpcClient;
use crate::blockchain::signer::SigningProvider;
use crate::blockchain::transaction::Transaction;
use crate::blockchain::types::{PipelineResult, RpcError, SubmitOptions, SubmitReport};

/// Runs the optional sign / encode / broadcast stages for one transaction.
#[derive(Debug, Clone)]
pub struct TxPipeline<S> {
    signer: S,
    node: Option<RpcClient>,
}

impl<S: SigningProvider> TxPipeline<S> {
    pub fn new(signer: S, node: Option<RpcClient>) -> Self {
        Self { signer, node }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub async fn run(&self, mut tx: Transaction, opts: SubmitOptions) -> PipelineResult<SubmitReport> {
        let mut signature = None;
        if opts.sign {
            let sig = self.signer.sign(tx.signing_hash(), tx.sender()).await?;
            tx.apply_signature(&sig)?;
            tracing::info!(sender = %tx.sender(), nonce = tx.nonce(), "Transaction signed");
            signature = Some(sig);
        }

        let mut raw: Option<Bytes> = None;
        if opts.broadcast || opts.binary {
            let encoded = if opts.broadcast || opts.sign {
                tx.serialize()?
            } else {
                tx.serialize_unsigned()
            };
            tracing::debug!(len = encoded.len(), "Transaction serialized");
            raw = Some(encoded);
        }

        let mut tx_id = None;
        let mut contract_address = None;
        if let Some(bytes) = raw.as_ref().filter(|_| opts.broadcast) {
            let node = self.node.as_ref().ok_or(RpcError::NoEndpoint)?;
            let id = node.send_raw_transaction(bytes).await?;
            tracing::info!(tx_id = %id, "Transaction broadcast");
            contract_address = tx.create_address();
            tx_id = Some(id);
        }

        Ok(SubmitReport {
            transaction: tx,
            signature,
            raw: if opts.binary { raw } else { None },
            tx_id,
            contract_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::SIGNATURE_LEN;
    use crate::blockchain::types::{
        EncodingError, ErrorKind, PipelineError, SignerError, SignerResult, Stage,
    };
    use alloy::primitives::{address, Address, B256, U256};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedSigner {
        sig: [u8; SIGNATURE_LEN],
        calls: AtomicU32,
    }

    impl FixedSigner {
        fn new() -> Self {
            let mut sig = [0u8; SIGNATURE_LEN];
            sig[..32].fill(0x11);
            sig[32..64].fill(0x22);
            sig[64] = 1;
            Self {
                sig,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl SigningProvider for FixedSigner {
        async fn sign(&self, _hash: B256, _signer: Address) -> SignerResult<[u8; SIGNATURE_LEN]> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sig)
        }
    }

    struct RefusingSigner;

    impl SigningProvider for RefusingSigner {
        async fn sign(&self, _hash: B256, _signer: Address) -> SignerResult<[u8; SIGNATURE_LEN]> {
            Err(SignerError::Rejected("locked".to_string()))
        }
    }

    fn sample() -> Transaction {
        Transaction::new(
            Some(address!("0000000000000000000000000000000000000001")),
            address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            1,
            U256::from(1000),
            U256::from(21000),
            U256::from(100),
            &[],
        )
    }

    #[tokio::test]
    async fn test_sign_only() {
        let pipeline = TxPipeline::new(FixedSigner::new(), None);
        let opts = SubmitOptions {
            sign: true,
            ..Default::default()
        };
        let report = pipeline.run(sample(), opts).await.unwrap();
        assert_eq!(report.signature, Some(pipeline.signer().sig));
        assert!(report.transaction.is_signed());
        assert!(report.raw.is_none());
        assert!(report.tx_id.is_none());
        assert_eq!(pipeline.signer().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_binary_without_sign_is_unsigned_encoding() {
        let pipeline = TxPipeline::new(FixedSigner::new(), None);
        let opts = SubmitOptions {
            binary: true,
            ..Default::default()
        };
        let report = pipeline.run(sample(), opts).await.unwrap();
        assert_eq!(report.raw, Some(sample().serialize_unsigned()));
        assert_eq!(pipeline.signer().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_failure_stops_before_encode() {
        let pipeline = TxPipeline::new(RefusingSigner, None);
        let opts = SubmitOptions {
            sign: true,
            binary: true,
            broadcast: true,
        };
        let err = pipeline.run(sample(), opts).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Sign);
        assert_eq!(err.kind(), ErrorKind::RemoteRejection);
    }

    #[tokio::test]
    async fn test_broadcast_unsigned_is_encoding_error() {
        let pipeline = TxPipeline::new(FixedSigner::new(), None);
        let opts = SubmitOptions {
            broadcast: true,
            ..Default::default()
        };
        let err = pipeline.run(sample(), opts).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Encode(EncodingError::IncompleteSignature)
        ));
    }

    #[tokio::test]
    async fn test_broadcast_without_node() {
        let pipeline = TxPipeline::new(FixedSigner::new(), None);
        let opts = SubmitOptions {
            sign: true,
            broadcast: true,
            ..Default::default()
        };
        let err = pipeline.run(sample(), opts).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Broadcast);
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }
}
