//! In-process signing provider backed by a local secp256k1 key.
//!
//! # Security
//! - Intended for development chains and tests; production signing goes
//!   through [`SignerClient`](crate::blockchain::signer::SignerClient)
//! - Keys are never logged or serialized

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::signer::SigningProvider;
use crate::blockchain::transaction::SIGNATURE_LEN;
use crate::blockchain::types::{SignerError, SignerResult};

/// Signing provider holding one private key.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    signer: PrivateKeySigner,
}

impl LocalSigner {
    /// Create a signer from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(private_key_hex: &str) -> SignerResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| SignerError::Local(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Local signer initialized");
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl SigningProvider for LocalSigner {
    async fn sign(&self, hash: B256, signer: Address) -> SignerResult<[u8; SIGNATURE_LEN]> {
        if signer != self.address() {
            return Err(SignerError::Rejected(format!(
                "no key for address {}",
                signer
            )));
        }
        let sig = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| SignerError::Local(format!("Signing failed: {}", e)))?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(&sig.r().to_be_bytes::<32>());
        out[32..64].copy_from_slice(&sig.s().to_be_bytes::<32>());
        out[64] = sig.v() as u8;
        Ok(out)
    }
}
