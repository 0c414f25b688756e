//! Error types for trace parsing and analysis
//!
//! This module defines the error handling system that covers:
//! - Unusable trace payloads (empty or structurally invalid input)
//! - Stack-slot address decoding failures
//! - Error conversion and propagation
//!
//! Malformed *fields* inside an otherwise usable trace are not errors:
//! parsers degrade them to defaults and report them as
//! [`ParseWarning`](crate::types::ParseWarning) records instead.

use thiserror::Error;

/// Top-level error type for the trace analysis system
///
/// These errors indicate that the RPC collaborator supplied nothing
/// usable; callers are expected to catch and surface them.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The top-level trace result was null or absent
    #[error("Empty trace result: {0}")]
    EmptyTrace(String),

    /// The struct log payload was missing or not an array of steps
    #[error("Empty or invalid struct log: {0}")]
    EmptyStructLog(String),

    /// The raw payload could not be deserialized at all
    #[error("Malformed trace JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure decoding an EVM stack slot into a callee address
///
/// Returned by [`decode_stack_address`](crate::utils::stack_utils::decode_stack_address)
/// so callers can choose to warn rather than silently dropping the
/// contract context.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackDecodeError {
    /// The stack slot was an empty string
    #[error("Empty stack slot")]
    Empty,

    /// The stack slot contained non-hexadecimal characters
    #[error("Stack slot is not valid hex: {0}")]
    NotHex(String),

    /// The stack slot encoded a value wider than 32 bytes
    #[error("Stack slot exceeds 32 bytes: {0} hex chars")]
    TooWide(usize),
}
