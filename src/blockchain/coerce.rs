//! Conversion of caller-supplied strings into integers and fixed-width bytes.
//!
//! Accepted forms:
//! - `""` is zero / empty
//! - `0x`-prefixed hex (an odd number of digits is padded with a leading zero nibble)
//! - bare hex for byte strings and addresses, decimal for quantities
//!
//! Callers pick the entry point that matches what the field means; nothing here
//! guesses between decimal and hex for an unprefixed string.

use alloy::primitives::{hex, Address, U256};

use crate::blockchain::types::CoercionError;

const ADDRESS_LEN: usize = 20;

/// Strip a `0x` prefix and left-pad an odd number of digits with `0`.
pub fn strip_hex(s: &str) -> String {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    }
}

/// Decode a hex string (prefixed or bare) into bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CoercionError> {
    hex::decode(strip_hex(s)).map_err(|e| CoercionError::MalformedInput {
        input: s.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a 20-byte address.
pub fn parse_address(s: &str) -> Result<Address, CoercionError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != ADDRESS_LEN {
        return Err(CoercionError::AddressLength {
            input: s.to_string(),
            len: bytes.len(),
        });
    }
    Ok(Address::from_slice(&bytes))
}

/// Parse a non-negative quantity given as decimal or `0x`-prefixed hex.
pub fn parse_quantity(s: &str) -> Result<U256, CoercionError> {
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    if s.starts_with("0x") {
        let bytes = decode_hex(s)?;
        return U256::try_from_be_slice(&bytes).ok_or_else(|| CoercionError::MalformedInput {
            input: s.to_string(),
            reason: format!("{} bytes does not fit in 256 bits", bytes.len()),
        });
    }
    U256::from_str_radix(s, 10).map_err(|e| CoercionError::MalformedInput {
        input: s.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a node-reported integer (hex or decimal), yielding 0 when it does not parse.
///
/// Only for values such as block height where a best-effort read is acceptable.
pub fn hex_to_int(s: &str) -> i64 {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => i64::from_str_radix(digits, 16),
        None => s.parse::<i64>(),
    };
    parsed.unwrap_or(0)
}

/// Render a quantity the way JSON-RPC expects it: `0x` followed by minimal hex.
pub fn to_quantity(value: U256) -> String {
    format!("{:#x}", value)
}
