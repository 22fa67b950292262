//! Signing providers.
//!
//! # Responsibilities
//! - Define the single capability the pipeline needs: sign a 32-byte hash for an address
//! - Talk to an external signing daemon over HTTP (`POST {endpoint}/sign`)
//!
//! Keys never pass through this crate when the daemon is used.

use std::future::Future;

use alloy::primitives::{hex, Address, B256};
use serde::{Deserialize, Serialize};

use crate::blockchain::coerce::decode_hex;
use crate::blockchain::transaction::SIGNATURE_LEN;
use crate::blockchain::types::{SignerError, SignerResult};

/// Anything that can produce a raw `r ‖ s ‖ recovery-id` signature over a hash.
pub trait SigningProvider {
    fn sign(
        &self,
        hash: B256,
        signer: Address,
    ) -> impl Future<Output = SignerResult<[u8; SIGNATURE_LEN]>> + Send;
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    hash: &'a str,
    addr: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Error", default)]
    error: String,
}

/// HTTP client for an external signing daemon.
#[derive(Debug, Clone)]
pub struct SignerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SignerClient {
    /// Create a client for the daemon at `endpoint` (e.g. `http://localhost:4767`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the daemon to sign `hash_hex` with the key for `addr_hex`.
    ///
    /// Both arguments are hex without a `0x` prefix.
    pub async fn sign_hex(&self, hash_hex: &str, addr_hex: &str) -> SignerResult<[u8; SIGNATURE_LEN]> {
        let body = SignRequest {
            hash: hash_hex,
            addr: addr_hex,
        };
        tracing::debug!(hash = hash_hex, addr = addr_hex, "Sending sign request");

        let url = format!("{}/sign", self.endpoint);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| SignerError::Unreachable {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|source| SignerError::Unreachable {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if status.is_client_error() || status.is_server_error() {
            return Err(SignerError::Rejected(format!("{}: {}", status, text.trim())));
        }

        let parsed: SignResponse = serde_json::from_str(&text)
            .map_err(|e| SignerError::MalformedResponse(e.to_string()))?;
        if !parsed.error.is_empty() {
            return Err(SignerError::Rejected(parsed.error));
        }

        decode_signature(&parsed.response)
    }
}

impl SigningProvider for SignerClient {
    async fn sign(&self, hash: B256, signer: Address) -> SignerResult<[u8; SIGNATURE_LEN]> {
        let hash_hex = hex::encode_upper(hash);
        let addr_hex = hex::encode_upper(signer);
        self.sign_hex(&hash_hex, &addr_hex).await
    }
}

fn decode_signature(s: &str) -> SignerResult<[u8; SIGNATURE_LEN]> {
    let bytes = decode_hex(s).map_err(|e| SignerError::MalformedSignature(e.to_string()))?;
    <[u8; SIGNATURE_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        SignerError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        ))
    })
}
