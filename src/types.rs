//! Core types for trace ingestion and analysis
//!
//! This module defines the data structures used throughout the engine:
//! - Raw RPC frames as returned by `debug_traceTransaction` /
//!   `debug_traceBlockByNumber` (hex-string numerics, camelCase keys)
//! - Decoded value objects (token transfers, state changes)
//! - Structured warnings and advisory records

use std::collections::BTreeMap;

pub use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// One call frame from a `callTracer`-style debug trace
///
/// Frames nest recursively through `calls`; all numeric fields arrive
/// as 0x-prefixed hex strings. Every field except `type` and `from` is
/// optional in practice, so the whole surface is `Option`-tolerant.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCallFrame {
    /// Call scheme: CALL, STATICCALL, DELEGATECALL, CREATE, ...
    #[serde(rename = "type")]
    pub call_type: String,
    /// Caller address as hex string
    pub from: String,
    /// Target address; absent for contract creations
    pub to: Option<String>,
    /// Native value in wei (hex)
    pub value: Option<String>,
    /// Gas supplied to the call (hex)
    pub gas: Option<String>,
    /// Gas consumed by the call (hex)
    pub gas_used: Option<String>,
    /// ABI-encoded call input (hex)
    pub input: Option<String>,
    /// Call return data (hex)
    pub output: Option<String>,
    /// Error label if the call failed (e.g. "execution reverted")
    pub error: Option<String>,
    /// Pre-decoded revert reason, when the node supplies one
    pub revert_reason: Option<String>,
    /// Nested sub-calls
    pub calls: Option<Vec<RawCallFrame>>,
    /// Event logs emitted while this frame executed
    pub logs: Option<Vec<RawLogEntry>>,
}

/// One event log inside a call frame
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLogEntry {
    /// Emitting contract address
    pub address: String,
    /// Event topics; topics[0] is the event signature hash
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed event data
    pub data: Option<String>,
}

/// One opcode step from a `structLogger` debug trace
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStructLogStep {
    /// Program counter
    pub pc: u64,
    /// Opcode mnemonic (e.g. "SLOAD", "CALL")
    pub op: String,
    /// Gas remaining before this step
    pub gas: u64,
    /// Node-reported cost of this step, when present
    pub gas_cost: Option<u64>,
    /// Call depth; the outermost frame executes at depth 1
    pub depth: u64,
    /// EVM stack contents, bottom first, as hex strings
    pub stack: Option<Vec<String>>,
    /// Memory contents as 32-byte hex words
    pub memory: Option<Vec<String>>,
}

/// One item of a `debug_traceBlockByNumber` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockTraceItem {
    /// Hash of the traced transaction
    pub tx_hash: String,
    /// Per-transaction call trace; null when tracing failed
    pub result: Option<RawCallFrame>,
}

/// A token movement decoded from the calldata of a tracked contract
///
/// Produced by fixed-offset parameter extraction on recognized
/// selectors (`transfer`, `transferFrom`, `mint`, `burn`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TokenTransfer {
    /// Sender; for `mint` this is the zero address
    pub from: Address,
    /// Recipient; for `burn` this is the zero address
    pub to: Address,
    /// Amount in base token units
    pub amount: U256,
    /// Gas consumed by the decoded call
    pub gas_used: u64,
    /// Hash of the transaction containing the call
    pub tx_hash: String,
}

/// A generic state-affecting call against a classified selector
///
/// Emitted for every call whose selector resolves in the registry,
/// including ones that are not token movements (admin, allowance, ...).
#[derive(Debug, Clone, Serialize)]
pub struct StateChange {
    /// Resolved function category
    pub category: FunctionCategory,
    /// Resolved function name, or the raw selector for unknowns
    pub function: String,
    /// Caller address
    pub from: Address,
    /// Target contract; absent for creations
    pub to: Option<Address>,
    /// Decoded amount when the function carries one, else zero
    pub amount: U256,
    /// Gas consumed by the call
    pub gas_used: u64,
    /// Hash of the containing transaction
    pub tx_hash: String,
}

/// Functional classification of a call selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCategory {
    /// `transfer` / `transferFrom` style value movement
    TokenMovement,
    /// Approval and allowance management
    Allowance,
    /// Mint, burn, and supply-control operations
    SupplyChange,
    /// Administrative operations (pause, ownership, ...)
    Admin,
    /// Read-only accessors
    View,
    /// Plain native-token transfer (empty calldata)
    NativeTransfer,
    /// Contract deployment
    ContractCreation,
    /// Anything the registry cannot classify
    Other,
}

impl FunctionCategory {
    /// Stable snake_case label, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionCategory::TokenMovement => "token_movement",
            FunctionCategory::Allowance => "allowance",
            FunctionCategory::SupplyChange => "supply_change",
            FunctionCategory::Admin => "admin",
            FunctionCategory::View => "view",
            FunctionCategory::NativeTransfer => "native_transfer",
            FunctionCategory::ContractCreation => "contract_creation",
            FunctionCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to warnings and advisories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A non-fatal data-quality note collected during parsing
///
/// Warnings are returned alongside successful output so a
/// partially-suspect trace can still be displayed with caveats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A hex field failed to parse and was defaulted to zero
    UnparsableHex {
        /// Which field degraded
        field: String,
        /// Node id the field belongs to
        node_id: usize,
    },
    /// An address field failed to parse and was dropped
    UnparsableAddress { field: String, node_id: usize },
    /// A call-op stack slot could not be decoded into a callee address
    StackAddressUndecodable {
        /// Index of the step whose context was dropped
        step_index: usize,
        reason: String,
    },
    /// A block item carried no trace result and was skipped
    MissingTraceResult { tx_hash: String },
    /// Event data was too short for its decoder
    TruncatedEventData { log_index: usize },
}

/// Structured advisory record for presentation layers
///
/// Heuristic findings are emitted as data, never as pre-rendered
/// English, so downstream code can localize and format them.
#[derive(Debug, Clone, Serialize)]
pub struct Advisory {
    /// Machine-readable finding code
    pub code: AdvisoryCode,
    /// How urgent the finding is
    pub severity: Severity,
    /// Finding-specific parameters (amounts, counts, hashes)
    pub params: BTreeMap<String, String>,
}

impl Advisory {
    /// Build an advisory from `(key, value)` parameter pairs
    pub fn new<I, K, V>(code: AdvisoryCode, severity: Severity, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            code,
            severity,
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Codes for gas-engine and block-processor heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryCode {
    /// Gas consumed by transactions that ultimately failed
    FailedTransactionWaste,
    /// A function category shows gas usage far above its mean
    HighGasVariance,
    /// Internal call chains nest deeper than the recommended bound
    DeepCallChain,
    /// Average gas per transaction is above the optimization threshold
    HighAverageGas,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_frame_deserializes_from_geth_shape() {
        let frame: RawCallFrame = serde_json::from_value(serde_json::json!({
            "type": "CALL",
            "from": "0x3ee18b2214aff97000d974cf647e7c347e8fa585",
            "to": "0x6c3ea9036406852006290770bedfcaba0e23a0e8",
            "gasUsed": "0x5208",
            "input": "0x",
            "calls": [{ "type": "STATICCALL", "from": "0x6c3ea9036406852006290770bedfcaba0e23a0e8" }]
        }))
        .unwrap();

        assert_eq!(frame.call_type, "CALL");
        assert_eq!(frame.gas_used.as_deref(), Some("0x5208"));
        assert_eq!(frame.calls.as_ref().unwrap().len(), 1);
        assert!(frame.error.is_none());
    }

    #[test]
    fn function_category_labels_are_snake_case() {
        assert_eq!(FunctionCategory::TokenMovement.as_str(), "token_movement");
        assert_eq!(
            serde_json::to_string(&FunctionCategory::SupplyChange).unwrap(),
            "\"supply_change\""
        );
    }

    #[test]
    fn advisory_collects_params() {
        let advisory = Advisory::new(
            AdvisoryCode::DeepCallChain,
            Severity::Warning,
            [("depth", "5"), ("tx_hash", "0xabc")],
        );
        assert_eq!(advisory.params.len(), 2);
        assert_eq!(advisory.params["depth"], "5");
    }
}
