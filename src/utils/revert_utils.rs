//! Revert reason extraction from call output data
//!
//! Failed call frames carry their revert payload in the `output` field.
//! This module decodes the two standard encodings:
//! - `Error(string)` - revert with message (selector 0x08c379a0)
//! - `Panic(uint256)` - Solidity panic code (selector 0x4e487b71)
//!
//! Anything else is left to the caller as opaque hex.

use alloy::primitives::hex;

/// Decode a revert reason from a frame's hex-encoded output
///
/// # Arguments
/// * `output` - The failed frame's `output` field as a hex string
///
/// # Returns
/// * `Some(String)` - Decoded error message or panic description
/// * `None` - Output is absent, not hex, or not a recognized encoding
pub fn decode_revert_reason(output: &str) -> Option<String> {
    let digits = output.strip_prefix("0x").unwrap_or(output);
    let bytes = hex::decode(digits).ok()?;
    if bytes.len() < 4 {
        return None;
    }

    match &bytes[0..4] {
        // Error(string)
        [0x08, 0xc3, 0x79, 0xa0] => decode_error_string(&bytes[4..]),
        // Panic(uint256)
        [0x4e, 0x48, 0x7b, 0x71] => decode_panic_code(&bytes[4..]),
        _ => None,
    }
}

/// Decode the ABI-encoded string payload of `Error(string)`
///
/// Layout: 32-byte offset, 32-byte length, then the UTF-8 bytes.
fn decode_error_string(payload: &[u8]) -> Option<String> {
    if payload.len() < 64 {
        return None;
    }
    let len = usize_word(&payload[32..64])?;
    let text = payload.get(64..64 + len)?;
    String::from_utf8(text.to_vec()).ok()
}

/// Map a `Panic(uint256)` code to its standard description
fn decode_panic_code(payload: &[u8]) -> Option<String> {
    if payload.len() < 32 {
        return None;
    }
    let code = usize_word(&payload[0..32])?;
    Some(match code {
        0x01 => "Panic: Assertion failed".to_string(),
        0x11 => "Panic: Arithmetic overflow".to_string(),
        0x12 => "Panic: Division by zero".to_string(),
        0x21 => "Panic: Invalid enum conversion".to_string(),
        0x22 => "Panic: Invalid storage byte array".to_string(),
        0x31 => "Panic: Pop on empty array".to_string(),
        0x32 => "Panic: Array index out of bounds".to_string(),
        0x41 => "Panic: Out of memory".to_string(),
        0x51 => "Panic: Call to uninitialized function".to_string(),
        code => format!("Panic: Unknown error code (0x{code:x})"),
    })
}

/// Read a big-endian 32-byte word into a usize, rejecting wide values
fn usize_word(word: &[u8]) -> Option<usize> {
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut value = [0u8; 8];
    value.copy_from_slice(&word[24..32]);
    usize::try_from(u64::from_be_bytes(value)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_error_string() {
        // "Insufficient balance" encoded as Error(string)
        let output = "0x08c379a0\
             0000000000000000000000000000000000000000000000000000000000000020\
             0000000000000000000000000000000000000000000000000000000000000014\
             496e73756666696369656e742062616c616e6365000000000000000000000000";
        assert_eq!(
            decode_revert_reason(output),
            Some("Insufficient balance".to_string())
        );
    }

    #[test]
    fn decodes_panic_codes() {
        let encode = |code: u8| {
            format!(
                "0x4e487b71{:0>62}{:02x}",
                "", code
            )
        };
        assert_eq!(
            decode_revert_reason(&encode(0x11)),
            Some("Panic: Arithmetic overflow".to_string())
        );
        assert_eq!(
            decode_revert_reason(&encode(0x12)),
            Some("Panic: Division by zero".to_string())
        );
        assert_eq!(
            decode_revert_reason(&encode(0xff)),
            Some("Panic: Unknown error code (0xff)".to_string())
        );
    }

    #[test]
    fn rejects_unrecognized_output() {
        assert_eq!(decode_revert_reason("0x"), None);
        assert_eq!(decode_revert_reason("0x00112233"), None);
        assert_eq!(decode_revert_reason("not hex at all"), None);
        // Error selector with truncated payload
        assert_eq!(decode_revert_reason("0x08c379a0"), None);
    }
}
