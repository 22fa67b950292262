//! Canonical transaction record, signing hash, and wire encoding.
//!
//! # Wire format
//! ```text
//! rlp([nonce, price, gas_limit, recipient | "", amount, data, v, r, s])
//! ```
//! The signing hash covers only the first six fields. The sender is never
//! encoded; it is carried alongside for signing and contract-address derivation.

use alloy::primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy::rlp::{BufMut, Decodable, Encodable, Header, EMPTY_STRING_CODE};

use crate::blockchain::types::{EncodingError, EncodingResult};

/// Offset added to the signer's recovery id before it is stored in `v`.
pub const RECOVERY_OFFSET: u8 = 27;

/// Length of a raw `r ‖ s ‖ recovery-id` signature.
pub const SIGNATURE_LEN: usize = 65;

const ADDRESS_LEN: usize = 20;

/// An account-model transaction, unsigned until [`Transaction::apply_signature`] runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    nonce: u64,
    price: U256,
    gas_limit: U256,
    /// `None` means contract creation.
    recipient: Option<Address>,
    amount: U256,
    data: Bytes,
    v: u8,
    r: U256,
    s: U256,
    sender: Address,
}

impl Transaction {
    /// Create an unsigned transaction. `data` is copied.
    pub fn new(
        recipient: Option<Address>,
        sender: Address,
        nonce: u64,
        amount: U256,
        gas_limit: U256,
        price: U256,
        data: &[u8],
    ) -> Self {
        Self {
            nonce,
            price,
            gas_limit,
            recipient,
            amount,
            data: Bytes::copy_from_slice(data),
            v: 0,
            r: U256::ZERO,
            s: U256::ZERO,
            sender,
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn price(&self) -> U256 {
        self.price
    }

    pub fn gas_limit(&self) -> U256 {
        self.gas_limit
    }

    pub fn recipient(&self) -> Option<Address> {
        self.recipient
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Stored recovery byte (`recovery id + 27` once signed, 0 before).
    pub fn v(&self) -> u8 {
        self.v
    }

    pub fn r(&self) -> U256 {
        self.r
    }

    pub fn s(&self) -> U256 {
        self.s
    }

    pub fn is_creation(&self) -> bool {
        self.recipient.is_none()
    }

    pub fn is_signed(&self) -> bool {
        self.v != 0 || !self.r.is_zero() || !self.s.is_zero()
    }

    /// Keccak-256 over `rlp([nonce, price, gas_limit, recipient, amount, data])`.
    pub fn signing_hash(&self) -> B256 {
        let payload_length = self.unsigned_fields_length();
        let mut buf = Vec::with_capacity(payload_length + 3);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut buf);
        self.encode_unsigned_fields(&mut buf);
        keccak256(&buf)
    }

    /// Store a raw `r ‖ s ‖ recovery-id` signature.
    pub fn apply_signature(&mut self, sig: &[u8]) -> EncodingResult<()> {
        if sig.len() != SIGNATURE_LEN {
            return Err(EncodingError::InvalidSignatureLength(sig.len()));
        }
        self.r = U256::from_be_slice(&sig[..32]);
        self.s = U256::from_be_slice(&sig[32..64]);
        self.v = sig[64].wrapping_add(RECOVERY_OFFSET);
        Ok(())
    }

    /// The raw signature as it was applied, or `None` if unsigned.
    pub fn signature(&self) -> Option<[u8; SIGNATURE_LEN]> {
        if !self.is_signed() {
            return None;
        }
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        out[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        out[64] = self.v.wrapping_sub(RECOVERY_OFFSET);
        Some(out)
    }

    /// Address the contract will occupy once this creation transaction is mined.
    ///
    /// `keccak256(rlp([sender, nonce]))[12..]`; `None` for non-creation transactions.
    pub fn create_address(&self) -> Option<Address> {
        match self.recipient {
            Some(_) => None,
            None => Some(self.sender.create(self.nonce)),
        }
    }

    /// Wire encoding of a signed transaction.
    pub fn serialize(&self) -> EncodingResult<Bytes> {
        if !self.is_signed() {
            return Err(EncodingError::IncompleteSignature);
        }
        Ok(self.serialize_unsigned())
    }

    /// Wire encoding without the signed check; signature fields are encoded as
    /// they stand (zero when unsigned).
    pub fn serialize_unsigned(&self) -> Bytes {
        let mut buf = Vec::with_capacity(self.length());
        self.encode(&mut buf);
        buf.into()
    }

    /// Transaction id of the signed encoding.
    pub fn hash(&self) -> EncodingResult<B256> {
        Ok(keccak256(self.serialize()?))
    }

    /// Recover the address that produced the stored signature.
    pub fn recover_sender(&self) -> EncodingResult<Address> {
        if !self.is_signed() {
            return Err(EncodingError::IncompleteSignature);
        }
        let parity = match self.v {
            27 => false,
            28 => true,
            other => {
                return Err(EncodingError::Decode(format!(
                    "recovery byte {} is not 27 or 28",
                    other
                )))
            }
        };
        Signature::new(self.r, self.s, parity)
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| EncodingError::Decode(e.to_string()))
    }

    /// Parse a wire encoding. The sender is recovered when the signature allows
    /// it; unsigned transactions and unrecoverable signatures (e.g. a replay
    /// protected `v`) leave it as the zero address.
    pub fn decode(raw: &[u8]) -> EncodingResult<Self> {
        let mut buf = raw;
        let mut tx = <Self as Decodable>::decode(&mut buf)
            .map_err(|e| EncodingError::Decode(e.to_string()))?;
        if !buf.is_empty() {
            return Err(EncodingError::Decode(format!(
                "{} trailing bytes after transaction",
                buf.len()
            )));
        }
        if tx.is_signed() {
            match tx.recover_sender() {
                Ok(sender) => tx.sender = sender,
                Err(e) => tracing::debug!(error = %e, "Sender not recoverable from signature"),
            }
        }
        Ok(tx)
    }

    fn recipient_length(&self) -> usize {
        match &self.recipient {
            Some(addr) => addr.length(),
            None => 1,
        }
    }

    fn encode_recipient(&self, out: &mut dyn BufMut) {
        match &self.recipient {
            Some(addr) => addr.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn unsigned_fields_length(&self) -> usize {
        self.nonce.length()
            + self.price.length()
            + self.gas_limit.length()
            + self.recipient_length()
            + self.amount.length()
            + self.data.length()
    }

    fn encode_unsigned_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.price.encode(out);
        self.gas_limit.encode(out);
        self.encode_recipient(out);
        self.amount.encode(out);
        self.data.encode(out);
    }

    fn fields_length(&self) -> usize {
        self.unsigned_fields_length() + self.v.length() + self.r.length() + self.s.length()
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.fields_length(),
        }
        .encode(out);
        self.encode_unsigned_fields(out);
        self.v.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.fields_length();
        payload_length + alloy::rlp::length_of_length(payload_length)
    }
}

impl Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy::rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy::rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy::rlp::Error::InputTooShort);
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        let nonce = u64::decode(&mut payload)?;
        let price = U256::decode(&mut payload)?;
        let gas_limit = U256::decode(&mut payload)?;
        let recipient = match Bytes::decode(&mut payload)? {
            b if b.is_empty() => None,
            b if b.len() == ADDRESS_LEN => Some(Address::from_slice(&b)),
            _ => {
                return Err(alloy::rlp::Error::Custom(
                    "recipient must be empty or 20 bytes",
                ))
            }
        };
        let amount = U256::decode(&mut payload)?;
        let data = Bytes::decode(&mut payload)?;
        let v = u8::decode(&mut payload)?;
        let r = U256::decode(&mut payload)?;
        let s = U256::decode(&mut payload)?;

        if !payload.is_empty() {
            return Err(alloy::rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length - payload.len(),
            });
        }

        Ok(Self {
            nonce,
            price,
            gas_limit,
            recipient,
            amount,
            data,
            v,
            r,
            s,
            sender: Address::ZERO,
        })
    }
}
