//! Call trace parsing and classification
//!
//! This module walks a nested `callTracer` tree and produces the flat,
//! normalized view the analyzers consume:
//! - One [`CallTraceNode`] per call, pre-order, with parent/depth links
//! - Decoded event logs with a globally increasing index
//! - Token transfers extracted from tracked-contract calldata
//! - Per-category gas attribution and contract interaction edges
//!
//! The walk uses an explicit work stack and keeps every counter local
//! to `parse`, so the parser is reentrant across concurrent callers.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use alloy::primitives::{hex, Address, B256, U256};
use serde::Serialize;
use tracing::debug;

use crate::errors::TraceError;
use crate::registry::{input_selector, EventKind, SignatureRegistry};
use crate::types::{
    FunctionCategory, ParseWarning, RawCallFrame, RawLogEntry, StateChange, TokenTransfer,
};
use crate::utils::hex_utils::{address_from_word, parse_address, parse_u256, parse_u64, short_prefix};
use crate::utils::revert_utils::decode_revert_reason;

/// Display prefix length for call input/output fields
const PREFIX_LEN: usize = 10;

/// One normalized call in the flattened trace tree
///
/// Nodes are created once during the parse and never mutated; `id` is
/// the pre-order position, `parent_id` links toward the root.
#[derive(Debug, Clone, Serialize)]
pub struct CallTraceNode {
    /// Pre-order position in the parse, starting at 0 for the root
    pub id: usize,
    /// Parent node id; `None` for the root
    pub parent_id: Option<usize>,
    /// Call scheme as reported by the tracer (CALL, DELEGATECALL, ...)
    pub call_kind: String,
    /// Nesting depth; root is 0, children are parent + 1
    pub depth: usize,
    /// Caller address
    pub from: Address,
    /// Target address; `None` for contract creations
    pub to: Option<Address>,
    /// Native value in wei
    pub value_wei: U256,
    /// Gas consumed by this call including its children
    pub gas_used: u64,
    /// Leading slice of the call input for display
    pub input_prefix: String,
    /// Leading slice of the call output for display
    pub output_prefix: String,
    /// Error label when the call failed
    pub error: Option<String>,
    /// Decoded revert reason, when the output carried one
    pub revert_reason: Option<String>,
    /// Registry-resolved contract name
    pub contract_name: String,
    /// Registry-resolved function name
    pub function_name: Option<String>,
    /// Functional classification of the call
    pub function_category: FunctionCategory,
}

/// One decoded event log in encounter order
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Globally increasing index across the whole trace
    pub log_index: usize,
    /// Emitting contract
    pub address: Address,
    /// Registry-resolved name of the emitting contract
    pub contract_name: String,
    /// Event signature hash, when the log carried topics
    pub topic0: Option<B256>,
    /// Resolved event name
    pub event_name: String,
    /// Decoded event fields, keyed by parameter name
    pub decoded: BTreeMap<String, String>,
    /// Whether this is an ERC-20 `Transfer`
    pub is_transfer: bool,
    /// Whether this is an ERC-20 `Approval`
    pub is_approval: bool,
}

/// Aggregate counters over one parsed trace
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceStats {
    /// Number of call nodes, root included
    pub total_calls: usize,
    /// Deepest nesting level observed
    pub max_depth: usize,
    /// Calls that reported an error
    pub failed_calls: usize,
    /// Distinct addresses appearing as caller or target
    pub unique_addresses: usize,
    /// Gas consumed by the root call
    pub total_gas: u64,
}

/// Complete output of one call-trace parse
///
/// Owned entirely by the caller; nothing is shared with the parser.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedTrace {
    /// Hash of the traced transaction
    pub tx_hash: String,
    /// Flattened call tree in pre-order
    pub nodes: Vec<CallTraceNode>,
    /// Decoded logs in encounter order
    pub logs: Vec<LogEntry>,
    /// Token transfers decoded from tracked-contract calldata
    pub transfers: Vec<TokenTransfer>,
    /// Classified state-affecting calls
    pub state_changes: Vec<StateChange>,
    /// Distinct `(caller, target)` pairs
    pub interaction_edges: BTreeSet<(Address, Address)>,
    /// Exclusive gas attributed per function category
    ///
    /// Each node contributes its own gas minus its children's, so the
    /// per-category sums partition the root's total.
    pub gas_by_category: BTreeMap<FunctionCategory, u64>,
    /// Aggregate counters
    pub stats: TraceStats,
    /// Data-quality notes collected along the way
    pub warnings: Vec<ParseWarning>,
}

/// Parser for `callTracer` trees
///
/// Holds only a registry borrow; all parse state lives inside `parse`.
pub struct CallTraceParser<'a> {
    registry: &'a SignatureRegistry,
}

impl<'a> CallTraceParser<'a> {
    /// Create a parser over the given registry
    pub fn new(registry: &'a SignatureRegistry) -> Self {
        Self { registry }
    }

    /// Parse a raw JSON trace result
    ///
    /// # Errors
    /// [`TraceError::EmptyTrace`] when the value is null, and
    /// [`TraceError::Json`] when it does not deserialize as a call
    /// frame. Malformed fields inside a valid frame degrade to
    /// defaults and surface as warnings instead.
    pub fn parse_value(
        &self,
        value: &serde_json::Value,
        tx_hash: &str,
    ) -> Result<ParsedTrace, TraceError> {
        if value.is_null() {
            return Err(TraceError::EmptyTrace(tx_hash.to_string()));
        }
        let frame: RawCallFrame = serde_json::from_value(value.clone())?;
        self.parse(&frame, tx_hash)
    }

    /// Parse a deserialized call frame into normalized records
    ///
    /// Performs two pre-order traversals: one building the node list
    /// and decoded facts, one extracting logs with a global index.
    pub fn parse(&self, root: &RawCallFrame, tx_hash: &str) -> Result<ParsedTrace, TraceError> {
        if root.call_type.is_empty() && root.from.is_empty() {
            return Err(TraceError::EmptyTrace(tx_hash.to_string()));
        }

        let mut nodes = Vec::new();
        let mut transfers = Vec::new();
        let mut state_changes = Vec::new();
        let mut interaction_edges = BTreeSet::new();
        let mut gas_by_category: BTreeMap<FunctionCategory, u64> = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut addresses: HashSet<Address> = HashSet::new();

        // Pre-order walk; children pushed in reverse so the leftmost
        // child is processed first.
        let mut stack: Vec<(&RawCallFrame, Option<usize>, usize)> = vec![(root, None, 0)];

        while let Some((frame, parent_id, depth)) = stack.pop() {
            let id = nodes.len();
            let node = self.build_node(frame, id, parent_id, depth, tx_hash, &mut warnings);

            addresses.insert(node.from);
            if let Some(to) = node.to {
                addresses.insert(to);
                interaction_edges.insert((node.from, to));
            }

            // Exclusive gas: subtract the children's reported usage so
            // category sums partition the root total.
            let children_gas: u64 = frame
                .calls
                .iter()
                .flatten()
                .map(|child| {
                    child
                        .gas_used
                        .as_deref()
                        .and_then(parse_u64)
                        .unwrap_or(0)
                })
                .sum();
            let own_gas = node.gas_used.saturating_sub(children_gas);
            *gas_by_category.entry(node.function_category).or_insert(0) += own_gas;

            self.decode_calldata(frame, &node, tx_hash, &mut transfers, &mut state_changes);

            if let Some(children) = &frame.calls {
                for child in children.iter().rev() {
                    stack.push((child, Some(id), depth + 1));
                }
            }

            nodes.push(node);
        }

        let logs = self.extract_logs(root, &mut warnings);

        let stats = TraceStats {
            total_calls: nodes.len(),
            max_depth: nodes.iter().map(|n| n.depth).max().unwrap_or(0),
            failed_calls: nodes.iter().filter(|n| n.error.is_some()).count(),
            unique_addresses: addresses.len(),
            total_gas: nodes.first().map(|n| n.gas_used).unwrap_or(0),
        };

        Ok(ParsedTrace {
            tx_hash: tx_hash.to_string(),
            nodes,
            logs,
            transfers,
            state_changes,
            interaction_edges,
            gas_by_category,
            stats,
            warnings,
        })
    }

    /// Normalize one raw frame into a call node
    fn build_node(
        &self,
        frame: &RawCallFrame,
        id: usize,
        parent_id: Option<usize>,
        depth: usize,
        tx_hash: &str,
        warnings: &mut Vec<ParseWarning>,
    ) -> CallTraceNode {
        let from = parse_address(&frame.from).unwrap_or_else(|| {
            warnings.push(ParseWarning::UnparsableAddress {
                field: "from".to_string(),
                node_id: id,
            });
            Address::ZERO
        });

        let to = match frame.to.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_address(raw);
                if parsed.is_none() {
                    warnings.push(ParseWarning::UnparsableAddress {
                        field: "to".to_string(),
                        node_id: id,
                    });
                }
                parsed
            }
        };

        let value_wei = tolerant_u256(frame.value.as_deref(), "value", id, warnings);
        let gas_used = tolerant_u64(frame.gas_used.as_deref(), "gasUsed", id, warnings);

        let input = frame.input.as_deref().unwrap_or("0x");
        let output = frame.output.as_deref().unwrap_or("0x");

        let (contract_name, function_name, function_category) = self.classify(to, input, tx_hash);

        let revert_reason = match &frame.error {
            Some(_) => frame
                .revert_reason
                .clone()
                .or_else(|| decode_revert_reason(output)),
            None => None,
        };

        CallTraceNode {
            id,
            parent_id,
            call_kind: if frame.call_type.is_empty() {
                "CALL".to_string()
            } else {
                frame.call_type.clone()
            },
            depth,
            from,
            to,
            value_wei,
            gas_used,
            input_prefix: short_prefix(input, PREFIX_LEN),
            output_prefix: short_prefix(output, PREFIX_LEN),
            error: frame.error.clone(),
            revert_reason,
            contract_name,
            function_name,
            function_category,
        }
    }

    /// Resolve contract name, function name, and category for a call
    fn classify(
        &self,
        to: Option<Address>,
        input: &str,
        tx_hash: &str,
    ) -> (String, Option<String>, FunctionCategory) {
        let Some(to) = to else {
            return (
                "Contract Creation".to_string(),
                None,
                FunctionCategory::ContractCreation,
            );
        };

        let contract_name = self.registry.contract_name(&to);

        if input_selector(input).is_none() {
            // Empty calldata: plain native transfer
            return (contract_name, None, FunctionCategory::NativeTransfer);
        }

        match self.registry.function_for_input(input) {
            Some(sig) => (contract_name, Some(sig.name.clone()), sig.category),
            None => {
                debug!(tx_hash, input = short_prefix(input, PREFIX_LEN), "unclassified selector");
                (
                    contract_name,
                    Some(short_prefix(input, PREFIX_LEN)),
                    FunctionCategory::Other,
                )
            }
        }
    }

    /// Decode tracked-contract calldata into transfers and state changes
    ///
    /// Known selectors on tracked contracts yield a [`TokenTransfer`]
    /// by fixed-offset parameter extraction; every selector-bearing
    /// call yields a generic [`StateChange`] with its category.
    fn decode_calldata(
        &self,
        frame: &RawCallFrame,
        node: &CallTraceNode,
        tx_hash: &str,
        transfers: &mut Vec<TokenTransfer>,
        state_changes: &mut Vec<StateChange>,
    ) {
        let input = frame.input.as_deref().unwrap_or("0x");
        if input_selector(input).is_none() {
            return;
        }

        let tracked = node.to.map(|to| self.registry.is_tracked(&to)).unwrap_or(false);
        let digits = input.strip_prefix("0x").unwrap_or(input);

        let mut amount = U256::ZERO;
        if tracked {
            if let Some(name) = node.function_name.as_deref() {
                let transfer = match name {
                    "transfer" => calldata_word(digits, 0)
                        .and_then(address_from_word)
                        .zip(calldata_word(digits, 1).and_then(parse_u256))
                        .map(|(to, value)| TokenTransfer {
                            from: node.from,
                            to,
                            amount: value,
                            gas_used: node.gas_used,
                            tx_hash: tx_hash.to_string(),
                        }),
                    "transferFrom" => {
                        let from = calldata_word(digits, 0).and_then(address_from_word);
                        let to = calldata_word(digits, 1).and_then(address_from_word);
                        let value = calldata_word(digits, 2).and_then(parse_u256);
                        match (from, to, value) {
                            (Some(from), Some(to), Some(value)) => Some(TokenTransfer {
                                from,
                                to,
                                amount: value,
                                gas_used: node.gas_used,
                                tx_hash: tx_hash.to_string(),
                            }),
                            _ => None,
                        }
                    }
                    "mint" => calldata_word(digits, 0)
                        .and_then(address_from_word)
                        .zip(calldata_word(digits, 1).and_then(parse_u256))
                        .map(|(to, value)| TokenTransfer {
                            from: Address::ZERO,
                            to,
                            amount: value,
                            gas_used: node.gas_used,
                            tx_hash: tx_hash.to_string(),
                        }),
                    "burn" => calldata_word(digits, 0).and_then(parse_u256).map(|value| {
                        TokenTransfer {
                            from: node.from,
                            to: Address::ZERO,
                            amount: value,
                            gas_used: node.gas_used,
                            tx_hash: tx_hash.to_string(),
                        }
                    }),
                    _ => None,
                };

                if let Some(transfer) = transfer {
                    amount = transfer.amount;
                    transfers.push(transfer);
                }
            }
        }

        state_changes.push(StateChange {
            category: node.function_category,
            function: node
                .function_name
                .clone()
                .unwrap_or_else(|| short_prefix(input, PREFIX_LEN)),
            from: node.from,
            to: node.to,
            amount,
            gas_used: node.gas_used,
            tx_hash: tx_hash.to_string(),
        });
    }

    /// Second pre-order traversal decoding every frame's logs
    fn extract_logs(&self, root: &RawCallFrame, warnings: &mut Vec<ParseWarning>) -> Vec<LogEntry> {
        let mut logs = Vec::new();
        let mut stack: Vec<&RawCallFrame> = vec![root];

        while let Some(frame) = stack.pop() {
            if let Some(raw_logs) = &frame.logs {
                for raw in raw_logs {
                    let index = logs.len();
                    logs.push(self.decode_log(raw, index, warnings));
                }
            }
            if let Some(children) = &frame.calls {
                for child in children.iter().rev() {
                    stack.push(child);
                }
            }
        }

        logs
    }

    /// Decode one raw log against the registry's event table
    fn decode_log(
        &self,
        raw: &RawLogEntry,
        log_index: usize,
        warnings: &mut Vec<ParseWarning>,
    ) -> LogEntry {
        let address = parse_address(&raw.address).unwrap_or_else(|| {
            warnings.push(ParseWarning::UnparsableAddress {
                field: "log.address".to_string(),
                node_id: log_index,
            });
            Address::ZERO
        });

        let topic0 = raw.topics.first().and_then(|t| parse_topic(t));
        let event = topic0.and_then(|t| self.registry.event(&t));

        let (event_name, kind) = match event {
            Some(sig) => (sig.name.clone(), sig.kind),
            None => ("Unknown Event".to_string(), EventKind::Other),
        };

        let mut decoded = BTreeMap::new();
        if matches!(kind, EventKind::Transfer | EventKind::Approval) {
            if raw.topics.len() >= 3 {
                let first = raw.topics[1].as_str();
                let second = raw.topics[2].as_str();
                let value = raw
                    .data
                    .as_deref()
                    .and_then(parse_u256)
                    .unwrap_or(U256::ZERO);

                let (a, b) = match kind {
                    EventKind::Transfer => ("from", "to"),
                    _ => ("owner", "spender"),
                };
                if let Some(addr) = address_from_word(first) {
                    decoded.insert(a.to_string(), addr.to_string());
                }
                if let Some(addr) = address_from_word(second) {
                    decoded.insert(b.to_string(), addr.to_string());
                }
                decoded.insert("value".to_string(), value.to_string());
            } else {
                warnings.push(ParseWarning::TruncatedEventData { log_index });
            }
        }

        LogEntry {
            log_index,
            address,
            contract_name: self.registry.contract_name(&address),
            topic0,
            event_name,
            decoded,
            is_transfer: kind == EventKind::Transfer,
            is_approval: kind == EventKind::Approval,
        }
    }
}

/// Hex digits of the `index`-th 32-byte calldata word after the selector
fn calldata_word(digits: &str, index: usize) -> Option<&str> {
    let start = 8 + index * 64;
    digits.get(start..start + 64)
}

/// Parse a 32-byte topic hash
fn parse_topic(raw: &str) -> Option<B256> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(digits).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    Some(B256::from_slice(&bytes))
}

/// Parse an optional hex field to `U256`, warning on failure
fn tolerant_u256(
    raw: Option<&str>,
    field: &str,
    node_id: usize,
    warnings: &mut Vec<ParseWarning>,
) -> U256 {
    match raw {
        None => U256::ZERO,
        Some(raw) => parse_u256(raw).unwrap_or_else(|| {
            warnings.push(ParseWarning::UnparsableHex {
                field: field.to_string(),
                node_id,
            });
            U256::ZERO
        }),
    }
}

/// Parse an optional hex field to `u64`, warning on failure
fn tolerant_u64(
    raw: Option<&str>,
    field: &str,
    node_id: usize,
    warnings: &mut Vec<ParseWarning>,
) -> u64 {
    match raw {
        None => 0,
        Some(raw) => parse_u64(raw).unwrap_or_else(|| {
            warnings.push(ParseWarning::UnparsableHex {
                field: field.to_string(),
                node_id,
            });
            0
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SignatureRegistry, PYUSD_ADDRESS};
    use serde_json::json;

    fn pyusd() -> String {
        format!("{PYUSD_ADDRESS}")
    }

    fn transfer_input(to: &str, amount: u64) -> String {
        format!(
            "0xa9059cbb{:0>64}{:064x}",
            to.trim_start_matches("0x"),
            amount
        )
    }

    #[test]
    fn flattens_nested_calls_with_depth_links() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "gasUsed": "0x100",
            "calls": [
                {
                    "type": "STATICCALL",
                    "from": "0x2222222222222222222222222222222222222222",
                    "to": "0x3333333333333333333333333333333333333333",
                    "gasUsed": "0x40",
                    "calls": [{
                        "type": "DELEGATECALL",
                        "from": "0x3333333333333333333333333333333333333333",
                        "to": "0x4444444444444444444444444444444444444444",
                        "gasUsed": "0x10"
                    }]
                },
                {
                    "type": "CALL",
                    "from": "0x2222222222222222222222222222222222222222",
                    "to": "0x5555555555555555555555555555555555555555",
                    "gasUsed": "0x20"
                }
            ]
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0xabc").unwrap();

        // 1 root + 3 nested calls
        assert_eq!(parsed.nodes.len(), 4);
        assert_eq!(parsed.stats.total_calls, 4);
        assert_eq!(parsed.stats.max_depth, 2);

        // Every non-root node sits one deeper than its parent
        for node in &parsed.nodes[1..] {
            let parent = &parsed.nodes[node.parent_id.unwrap()];
            assert_eq!(node.depth, parent.depth + 1);
        }
        assert!(parsed.nodes[0].parent_id.is_none());

        // Pre-order: the STATICCALL subtree precedes the sibling CALL
        assert_eq!(parsed.nodes[1].call_kind, "STATICCALL");
        assert_eq!(parsed.nodes[2].call_kind, "DELEGATECALL");
        assert_eq!(parsed.nodes[3].call_kind, "CALL");
    }

    #[test]
    fn category_gas_partitions_root_total() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x1111111111111111111111111111111111111111",
            "to": pyusd(),
            "gasUsed": "0x1000",
            "input": transfer_input("0x2222222222222222222222222222222222222222", 5),
            "calls": [{
                "type": "STATICCALL",
                "from": pyusd(),
                "to": "0x3333333333333333333333333333333333333333",
                "gasUsed": "0x300",
                "input": "0x70a08231"
            }]
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0xabc").unwrap();
        let attributed: u64 = parsed.gas_by_category.values().sum();
        assert_eq!(attributed, parsed.stats.total_gas);
        assert_eq!(
            parsed.gas_by_category[&FunctionCategory::TokenMovement],
            0x1000 - 0x300
        );
    }

    #[test]
    fn decodes_transfer_calldata_on_tracked_contract() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);
        let recipient = "0x00000000000000000000000000000000000000bb";

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": pyusd(),
            "gasUsed": "0xc350",
            "input": transfer_input(recipient, 1_000_000)
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0xfeed").unwrap();

        assert_eq!(parsed.transfers.len(), 1);
        let transfer = &parsed.transfers[0];
        assert_eq!(transfer.amount, U256::from(1_000_000u64));
        assert_eq!(transfer.to, parse_address(recipient).unwrap());
        assert_eq!(transfer.tx_hash, "0xfeed");

        let node = &parsed.nodes[0];
        assert_eq!(node.function_category, FunctionCategory::TokenMovement);
        assert_eq!(node.function_name.as_deref(), Some("transfer"));
        assert_eq!(node.contract_name, "PYUSD Token");
    }

    #[test]
    fn same_selector_on_untracked_contract_yields_no_transfer() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x9999999999999999999999999999999999999999",
            "gasUsed": "0xc350",
            "input": transfer_input("0x00000000000000000000000000000000000000bb", 7)
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0x1").unwrap();
        assert!(parsed.transfers.is_empty());
        // The call is still classified and recorded as a state change
        assert_eq!(parsed.state_changes.len(), 1);
        assert_eq!(
            parsed.state_changes[0].category,
            FunctionCategory::TokenMovement
        );
    }

    #[test]
    fn missing_to_classifies_as_creation() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CREATE",
            "from": "0x00000000000000000000000000000000000000aa",
            "gasUsed": "0x30000",
            "input": "0x6080604052"
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0x1").unwrap();
        let node = &parsed.nodes[0];
        assert!(node.to.is_none());
        assert_eq!(node.function_category, FunctionCategory::ContractCreation);
        assert_eq!(node.contract_name, "Contract Creation");
    }

    #[test]
    fn bad_hex_degrades_with_warning() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x00000000000000000000000000000000000000bb",
            "value": "0xnotanumber",
            "gasUsed": "0x100"
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0x1").unwrap();
        assert_eq!(parsed.nodes[0].value_wei, U256::ZERO);
        assert!(parsed
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::UnparsableHex { field, .. } if field == "value")));
    }

    #[test]
    fn error_surfaces_without_halting_siblings() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        // "Insufficient balance" as Error(string)
        let revert_output = "0x08c379a0\
             0000000000000000000000000000000000000000000000000000000000000020\
             0000000000000000000000000000000000000000000000000000000000000014\
             496e73756666696369656e742062616c616e6365000000000000000000000000";

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x00000000000000000000000000000000000000bb",
            "gasUsed": "0x200",
            "calls": [
                {
                    "type": "CALL",
                    "from": "0x00000000000000000000000000000000000000bb",
                    "to": "0x00000000000000000000000000000000000000cc",
                    "gasUsed": "0x80",
                    "error": "execution reverted",
                    "output": revert_output
                },
                {
                    "type": "CALL",
                    "from": "0x00000000000000000000000000000000000000bb",
                    "to": "0x00000000000000000000000000000000000000dd",
                    "gasUsed": "0x40"
                }
            ]
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0x1").unwrap();
        assert_eq!(parsed.nodes.len(), 3);
        assert_eq!(parsed.stats.failed_calls, 1);
        assert_eq!(
            parsed.nodes[1].revert_reason.as_deref(),
            Some("Insufficient balance")
        );
        // The sibling after the failed call was still parsed
        assert!(parsed.nodes[2].error.is_none());
    }

    #[test]
    fn logs_decode_in_encounter_order() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);

        let transfer_topic = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
        let approval_topic = "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925";

        let frame: RawCallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": pyusd(),
            "gasUsed": "0x100",
            "logs": [{
                "address": pyusd(),
                "topics": [
                    approval_topic,
                    "0x00000000000000000000000000000000000000000000000000000000000000aa",
                    "0x00000000000000000000000000000000000000000000000000000000000000bb"
                ],
                "data": "0x05"
            }],
            "calls": [{
                "type": "CALL",
                "from": pyusd(),
                "to": pyusd(),
                "gasUsed": "0x50",
                "logs": [{
                    "address": pyusd(),
                    "topics": [
                        transfer_topic,
                        "0x00000000000000000000000000000000000000000000000000000000000000aa",
                        "0x00000000000000000000000000000000000000000000000000000000000000bb"
                    ],
                    "data": "0x0f4240"
                }]
            }]
        }))
        .unwrap();

        let parsed = parser.parse(&frame, "0x1").unwrap();
        assert_eq!(parsed.logs.len(), 2);

        let approval = &parsed.logs[0];
        assert_eq!(approval.log_index, 0);
        assert!(approval.is_approval);
        assert_eq!(approval.event_name, "Approval");
        assert_eq!(approval.decoded["value"], "5");

        let transfer = &parsed.logs[1];
        assert_eq!(transfer.log_index, 1);
        assert!(transfer.is_transfer);
        assert_eq!(transfer.contract_name, "PYUSD Token");
        assert_eq!(transfer.decoded["value"], "1000000");
    }

    #[test]
    fn null_trace_is_a_hard_error() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let parser = CallTraceParser::new(&registry);
        let result = parser.parse_value(&serde_json::Value::Null, "0x1");
        assert!(matches!(result, Err(TraceError::EmptyTrace(_))));
    }
}
