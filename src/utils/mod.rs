//! Utility functions shared across the parsers and analyzers
//!
//! # Modules
//!
//! - [`hex_utils`]: Tolerant parsing of the 0x-hex strings debug
//!   traces carry for every numeric and address field
//!
//! - [`stack_utils`]: Decoding EVM stack slots into callee addresses
//!   with explicit failure reporting
//!
//! - [`revert_utils`]: Revert reason extraction
//!   - Standard `Error(string)` decoding
//!   - Solidity `Panic(uint256)` code interpretation

/// Tolerant hex string parsing
pub mod hex_utils;

/// Revert reason extraction
pub mod revert_utils;

/// EVM stack slot decoding
pub mod stack_utils;
