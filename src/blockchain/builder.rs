//! Transaction construction from caller-supplied strings.
//!
//! # Responsibilities
//! - Validate amount / gas / price / addresses / payload
//! - Resolve the sender's nonce (caller-supplied, or fetched from the node)
//! - Produce an unsigned [`Transaction`]
//!
//! # Nonce policy
//! A non-zero nonce is used as given. A zero nonce is resolved by asking the
//! node for `eth_getTransactionCount(sender, eth_blockNumber)` and using the
//! answer unmodified: the count of sent transactions is already the next nonce.
//! Two concurrent builds for the same sender can resolve the same nonce;
//! serialising them is the caller's job.

use alloy::primitives::{Address, U256};

use crate::blockchain::client::{BlockId, RpcClient};
use crate::blockchain::coerce::{decode_hex, parse_address, parse_quantity};
use crate::blockchain::transaction::Transaction;
use crate::blockchain::types::{BuildError, BuildResult};

/// Fields shared by every transaction kind, as the caller typed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxParams {
    /// Sender address (hex).
    pub from: String,
    /// Value to transfer; decimal or `0x` hex, empty for zero.
    pub amount: String,
    /// Gas limit; decimal or `0x` hex, empty for zero.
    pub gas: String,
    /// Gas price; decimal or `0x` hex, empty for zero.
    pub price: String,
    /// Explicit nonce, or 0 to fetch it from the node.
    pub nonce: u64,
}

struct Common {
    sender: Address,
    amount: U256,
    gas: U256,
    price: U256,
}

/// Builds unsigned transactions, consulting the node for nonces when needed.
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    node: Option<RpcClient>,
}

impl TxBuilder {
    /// Create a builder. Without a node every call must carry an explicit nonce.
    pub fn new(node: Option<RpcClient>) -> Self {
        Self { node }
    }

    /// A value transfer to `to`.
    pub async fn send(&self, params: &TxParams, to: &str) -> BuildResult<Transaction> {
        let common = check_common(params)?;
        let recipient = check_recipient(to)?;
        let nonce = self.resolve_nonce(common.sender, params.nonce).await?;
        Ok(common.into_transaction(Some(recipient), nonce, &[]))
    }

    /// A contract creation carrying `code` (may be empty).
    pub async fn create(&self, params: &TxParams, code: &str) -> BuildResult<Transaction> {
        let common = check_common(params)?;
        let data = decode_hex(code).map_err(BuildError::InvalidData)?;
        let nonce = self.resolve_nonce(common.sender, params.nonce).await?;
        Ok(common.into_transaction(None, nonce, &data))
    }

    /// Like [`TxBuilder::create`], but rejects a destination address if one is given.
    pub async fn create_checked(
        &self,
        params: &TxParams,
        to: &str,
        code: &str,
    ) -> BuildResult<Transaction> {
        if !to.is_empty() {
            return Err(BuildError::UnexpectedRecipient);
        }
        self.create(params, code).await
    }

    /// A contract call to `to` with payload `data`.
    pub async fn call(&self, params: &TxParams, to: &str, data: &str) -> BuildResult<Transaction> {
        let common = check_common(params)?;
        let recipient = check_recipient(to)?;
        let data = decode_hex(data).map_err(BuildError::InvalidData)?;
        let nonce = self.resolve_nonce(common.sender, params.nonce).await?;
        Ok(common.into_transaction(Some(recipient), nonce, &data))
    }

    async fn resolve_nonce(&self, sender: Address, given: u64) -> BuildResult<u64> {
        if given != 0 {
            return Ok(given);
        }
        let node = self.node.as_ref().ok_or(BuildError::NonceRequired)?;

        let height = node.block_number().await.map_err(BuildError::NonceLookup)?;
        let height = u64::try_from(height).unwrap_or_else(|_| {
            tracing::warn!(height, "Node reported a negative block height, using 0");
            0
        });
        let nonce = node
            .transaction_count(sender, BlockId::Number(height))
            .await
            .map_err(BuildError::NonceLookup)?;

        tracing::debug!(sender = %sender, block = height, nonce, "Fetched account nonce");
        Ok(nonce)
    }
}

impl Common {
    fn into_transaction(self, recipient: Option<Address>, nonce: u64, data: &[u8]) -> Transaction {
        Transaction::new(
            recipient,
            self.sender,
            nonce,
            self.amount,
            self.gas,
            self.price,
            data,
        )
    }
}

fn check_common(params: &TxParams) -> BuildResult<Common> {
    let amount = parse_quantity(&params.amount).map_err(BuildError::InvalidAmount)?;
    let gas = parse_quantity(&params.gas).map_err(BuildError::InvalidGas)?;
    let price = parse_quantity(&params.price).map_err(BuildError::InvalidPrice)?;

    if params.from.is_empty() {
        return Err(BuildError::MissingSender);
    }
    let sender = parse_address(&params.from).map_err(|source| BuildError::InvalidAddress {
        field: "from",
        source,
    })?;

    Ok(Common {
        sender,
        amount,
        gas,
        price,
    })
}

fn check_recipient(to: &str) -> BuildResult<Address> {
    if to.is_empty() {
        return Err(BuildError::MissingRecipient);
    }
    parse_address(to).map_err(|source| BuildError::InvalidAddress { field: "to", source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const FROM: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const TO: &str = "0x0000000000000000000000000000000000000001";

    fn params(nonce: u64) -> TxParams {
        TxParams {
            from: FROM.to_string(),
            amount: "1000".to_string(),
            gas: "21000".to_string(),
            price: "0x64".to_string(),
            nonce,
        }
    }

    #[tokio::test]
    async fn test_send_with_explicit_nonce() {
        let tx = TxBuilder::new(None).send(&params(1), TO).await.unwrap();
        assert_eq!(tx.nonce(), 1);
        assert_eq!(tx.amount(), U256::from(1000));
        assert_eq!(tx.gas_limit(), U256::from(21000));
        assert_eq!(tx.price(), U256::from(100));
        assert_eq!(tx.recipient(), Some(address!("0000000000000000000000000000000000000001")));
        assert_eq!(tx.sender(), address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
        assert!(tx.data().is_empty());
        assert!(!tx.is_signed());
    }

    #[tokio::test]
    async fn test_empty_quantities_are_zero() {
        let p = TxParams {
            from: FROM.to_string(),
            nonce: 3,
            ..Default::default()
        };
        let tx = TxBuilder::new(None).send(&p, TO).await.unwrap();
        assert_eq!(tx.amount(), U256::ZERO);
        assert_eq!(tx.gas_limit(), U256::ZERO);
        assert_eq!(tx.price(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_invalid_fields_are_named() {
        let builder = TxBuilder::new(None);

        let mut p = params(1);
        p.amount = "ten".into();
        assert!(matches!(builder.send(&p, TO).await, Err(BuildError::InvalidAmount(_))));

        let mut p = params(1);
        p.gas = "0xgg".into();
        assert!(matches!(builder.send(&p, TO).await, Err(BuildError::InvalidGas(_))));

        let mut p = params(1);
        p.price = "1.5".into();
        assert!(matches!(builder.send(&p, TO).await, Err(BuildError::InvalidPrice(_))));

        let mut p = params(1);
        p.from = "0x1234".into();
        assert!(matches!(
            builder.send(&p, TO).await,
            Err(BuildError::InvalidAddress { field: "from", .. })
        ));

        let mut p = params(1);
        p.from = String::new();
        assert!(matches!(builder.send(&p, TO).await, Err(BuildError::MissingSender)));
    }

    #[tokio::test]
    async fn test_recipient_rules() {
        let builder = TxBuilder::new(None);
        assert!(matches!(builder.send(&params(1), "").await, Err(BuildError::MissingRecipient)));
        assert!(matches!(
            builder.call(&params(1), "", "0x00").await,
            Err(BuildError::MissingRecipient)
        ));
        assert!(matches!(
            builder.send(&params(1), "0xabc").await,
            Err(BuildError::InvalidAddress { field: "to", .. })
        ));
        assert!(matches!(
            builder.create_checked(&params(1), TO, "0x00").await,
            Err(BuildError::UnexpectedRecipient)
        ));
    }

    #[tokio::test]
    async fn test_create_and_call_payloads() {
        let builder = TxBuilder::new(None);

        let tx = builder.create(&params(2), "0x6060").await.unwrap();
        assert!(tx.is_creation());
        assert_eq!(tx.data().as_ref(), &[0x60, 0x60]);
        assert!(tx.create_address().is_some());

        let empty = builder.create(&params(2), "").await.unwrap();
        assert!(empty.data().is_empty());

        let tx = builder.call(&params(2), TO, "a9059cbb").await.unwrap();
        assert_eq!(tx.data().as_ref(), &[0xa9, 0x05, 0x9c, 0xbb]);

        assert!(matches!(
            builder.call(&params(2), TO, "0xnothex").await,
            Err(BuildError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_nonce_without_node_requires_nonce() {
        let err = TxBuilder::new(None).send(&params(0), TO).await.unwrap_err();
        assert!(matches!(err, BuildError::NonceRequired));
    }

    #[tokio::test]
    async fn test_validation_precedes_nonce_lookup() {
        // unreachable node: a bad amount must fail before any network call
        let builder = TxBuilder::new(Some(RpcClient::new("http://127.0.0.1:1")));
        let mut p = params(0);
        p.amount = "bad".into();
        assert!(matches!(builder.send(&p, TO).await, Err(BuildError::InvalidAmount(_))));
    }
}
