//! EVM stack slot decoding
//!
//! When a `CALL`/`STATICCALL`/`DELEGATECALL` step executes, the callee
//! address sits in the second-from-top stack slot. Nodes encode stack
//! values inconsistently: 0x-prefixed, bare hex, zero-padded to 32
//! bytes, or trimmed to the significant digits. This module isolates
//! that branching into a single pure function with explicit failure.

use alloy::primitives::{hex, Address};

use crate::errors::StackDecodeError;

/// Decode a raw stack slot into the address held in its low 20 bytes
///
/// Accepts any hex width up to 32 bytes; the value is left-padded and
/// the right-most 20 bytes become the address.
///
/// # Arguments
/// * `raw` - Stack slot exactly as the struct log encodes it
///
/// # Returns
/// * `Ok(Address)` - Decoded callee address
/// * `Err(StackDecodeError)` - Slot was empty, non-hex, or too wide
pub fn decode_stack_address(raw: &str) -> Result<Address, StackDecodeError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Err(StackDecodeError::Empty);
    }
    if digits.len() > 64 {
        return Err(StackDecodeError::TooWide(digits.len()));
    }

    let padded = format!("{digits:0>64}");
    let bytes = hex::decode(&padded).map_err(|_| StackDecodeError::NotHex(raw.to_string()))?;

    Ok(Address::from_slice(&bytes[12..]))
}

/// The second-from-top slot of a call-op stack, if the stack is deep enough
///
/// Struct logs list the stack bottom first, so the slot holding the
/// callee address is at `len - 2`.
pub fn callee_slot(stack: &[String]) -> Option<&str> {
    if stack.len() < 2 {
        return None;
    }
    Some(stack[stack.len() - 2].as_str())
}
