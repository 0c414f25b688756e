//! Tolerant parsing of hex-encoded trace fields
//!
//! Debug traces encode every numeric field as a 0x-prefixed hex string
//! and occasionally omit the prefix or the field altogether. These
//! helpers degrade to a default instead of failing, per the engine's
//! malformed-input tolerance: a bad field costs a warning, not a parse.

use alloy::primitives::{hex, Address, U256};

/// Parse a hex string into a `U256`, returning `None` on malformed input
///
/// Accepts `0x`-prefixed and bare hex. Empty strings and `"0x"` decode
/// to zero, matching how nodes encode absent values.
pub fn parse_u256(raw: &str) -> Option<U256> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Parse a hex string into a `u64`, returning `None` on malformed input
///
/// Values wider than 64 bits are rejected rather than truncated.
pub fn parse_u64(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a 20-byte address from a hex string
///
/// Accepts `0x`-prefixed and bare hex; anything that does not decode
/// to exactly 20 bytes yields `None`.
pub fn parse_address(raw: &str) -> Option<Address> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(digits).ok()?;
    if bytes.len() != 20 {
        return None;
    }
    Some(Address::from_slice(&bytes))
}

/// Extract an address from a 32-byte topic or calldata word
///
/// Addresses are right-aligned in 32-byte words: hex chars 24..64 hold
/// the address. Shorter words are rejected.
pub fn address_from_word(raw: &str) -> Option<Address> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.len() < 64 {
        return None;
    }
    parse_address(&digits[digits.len() - 40..])
}

/// Truncate a hex string to a display prefix of at most `len` chars
///
/// Used for input/output prefixes on call nodes, where the selector and
/// the first words are enough for diagnostics.
pub fn short_prefix(raw: &str, len: usize) -> String {
    if raw.len() <= len {
        raw.to_string()
    } else {
        raw[..len].to_string()
    }
}
