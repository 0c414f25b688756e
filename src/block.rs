//! Block-level batch processing
//!
//! Applies the call-trace parser across every transaction of a
//! `debug_traceBlockByNumber` response and aggregates the results:
//! per-transaction summaries, a block-wide category histogram, a
//! deduplicated transfer list, depth-tagged internal calls into
//! registry contracts, and lightweight pattern flags.
//!
//! One unusable item degrades to a failed summary plus a warning; the
//! rest of the block still processes. Only the single-transaction
//! entry points treat an empty trace as a hard error.

use std::collections::{BTreeMap, HashSet};

use alloy::primitives::Address;
use serde::Serialize;
use tracing::warn;

use crate::parsers::call_trace::{CallTraceParser, ParsedTrace};
use crate::registry::SignatureRegistry;
use crate::types::{BlockTraceItem, FunctionCategory, ParseWarning, TokenTransfer};

/// Admin calls in one block at or above this count flag a burst
pub const ADMIN_BURST_THRESHOLD: usize = 5;

/// Tracked-transaction failure rate (percent) that flags the block
pub const FAILURE_RATE_THRESHOLD: f64 = 10.0;

/// Per-transaction rollup of one parsed trace
#[derive(Debug, Clone, Serialize)]
pub struct TxSummary {
    /// Transaction hash
    pub tx_hash: String,
    /// Whether any call touched a tracked contract
    pub tracked_interaction: bool,
    /// Whether a token transfer was decoded
    pub is_transfer: bool,
    /// Whether a supply-increasing call was decoded
    pub is_mint: bool,
    /// Whether a supply-decreasing call was decoded
    pub is_burn: bool,
    /// Gas consumed by the root call
    pub gas_used: u64,
    /// Whether the root call reported an error
    pub failed: bool,
    /// Category of the root call
    pub root_category: FunctionCategory,
    /// Number of decoded transfers in the transaction
    pub transfer_count: usize,
}

/// A sub-call into a registry contract, tagged with its depth
#[derive(Debug, Clone, Serialize)]
pub struct InternalCall {
    /// Transaction the call belongs to
    pub tx_hash: String,
    /// Nesting depth of the call (root is 0)
    pub depth: usize,
    /// Caller address
    pub from: Address,
    /// Registry-resolved target
    pub to: Address,
    /// Target contract name
    pub contract_name: String,
    /// Resolved function name, when the selector was known
    pub function: Option<String>,
    /// Gas consumed by the call
    pub gas_used: u64,
}

/// A block-wide pattern worth surfacing
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum BlockPattern {
    /// Both supply directions moved inside one block
    MintAndBurn { mint_count: usize, burn_count: usize },
    /// Unusually many administrative calls
    AdminBurst { count: usize, threshold: usize },
    /// Tracked transactions failing beyond the acceptable rate
    HighFailureRate {
        failed: usize,
        total: usize,
        rate_percent: f64,
    },
}

/// Aggregated analysis of one block's traces
#[derive(Debug, Clone, Serialize)]
pub struct BlockAnalysis {
    /// Block these traces came from
    pub block_number: u64,
    /// One summary per transaction, in block order
    pub summaries: Vec<TxSummary>,
    /// Call counts per function category across the block
    pub category_histogram: BTreeMap<FunctionCategory, u64>,
    /// Deduplicated transfers across all transactions
    pub transfers: Vec<TokenTransfer>,
    /// Sub-calls into registry contracts, depth-tagged
    pub internal_calls: Vec<InternalCall>,
    /// Detected block-wide patterns
    pub patterns: Vec<BlockPattern>,
    /// Data-quality notes from all transactions
    pub warnings: Vec<ParseWarning>,
}

/// Batch processor over block-level trace responses
pub struct BlockProcessor<'a> {
    registry: &'a SignatureRegistry,
}

impl<'a> BlockProcessor<'a> {
    /// Create a processor over the given registry
    pub fn new(registry: &'a SignatureRegistry) -> Self {
        Self { registry }
    }

    /// Process every per-transaction trace item of a block
    pub fn process(&self, items: &[BlockTraceItem], block_number: u64) -> BlockAnalysis {
        let parser = CallTraceParser::new(self.registry);

        let mut summaries = Vec::with_capacity(items.len());
        let mut category_histogram: BTreeMap<FunctionCategory, u64> = BTreeMap::new();
        let mut transfers = Vec::new();
        let mut seen_transfers: HashSet<TokenTransfer> = HashSet::new();
        let mut internal_calls = Vec::new();
        let mut warnings = Vec::new();
        let mut admin_calls = 0usize;

        for item in items {
            let parsed = match &item.result {
                Some(frame) => parser.parse(frame, &item.tx_hash),
                None => Err(crate::errors::TraceError::EmptyTrace(item.tx_hash.clone())),
            };

            let parsed = match parsed {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(tx_hash = item.tx_hash, %err, "skipping unusable trace item");
                    warnings.push(ParseWarning::MissingTraceResult {
                        tx_hash: item.tx_hash.clone(),
                    });
                    summaries.push(failed_placeholder(&item.tx_hash));
                    continue;
                }
            };

            for node in &parsed.nodes {
                *category_histogram
                    .entry(node.function_category)
                    .or_insert(0) += 1;
            }

            admin_calls += parsed
                .state_changes
                .iter()
                .filter(|c| c.category == FunctionCategory::Admin)
                .count();

            for transfer in &parsed.transfers {
                if seen_transfers.insert(transfer.clone()) {
                    transfers.push(transfer.clone());
                }
            }

            self.collect_internal_calls(&parsed, &mut internal_calls);

            summaries.push(self.summarize(&parsed));
            warnings.extend(parsed.warnings);
        }

        let patterns = detect_patterns(&summaries, admin_calls);

        BlockAnalysis {
            block_number,
            summaries,
            category_histogram,
            transfers,
            internal_calls,
            patterns,
            warnings,
        }
    }

    /// Roll one parsed trace up into a summary row
    fn summarize(&self, parsed: &ParsedTrace) -> TxSummary {
        let tracked_interaction = parsed
            .nodes
            .iter()
            .any(|n| n.to.map(|to| self.registry.is_tracked(&to)).unwrap_or(false));

        let is_mint = parsed
            .transfers
            .iter()
            .any(|t| t.from == Address::ZERO)
            || has_supply_change(parsed, &["mint", "increaseSupply"]);
        let is_burn = parsed.transfers.iter().any(|t| t.to == Address::ZERO)
            || has_supply_change(parsed, &["burn", "decreaseSupply"]);

        let root = &parsed.nodes[0];
        TxSummary {
            tx_hash: parsed.tx_hash.clone(),
            tracked_interaction,
            is_transfer: !parsed.transfers.is_empty(),
            is_mint,
            is_burn,
            gas_used: root.gas_used,
            failed: root.error.is_some(),
            root_category: root.function_category,
            transfer_count: parsed.transfers.len(),
        }
    }

    /// Pull out sub-calls whose target the registry recognizes
    fn collect_internal_calls(&self, parsed: &ParsedTrace, out: &mut Vec<InternalCall>) {
        for node in parsed.nodes.iter().filter(|n| n.depth > 0) {
            let Some(to) = node.to else { continue };
            if self.registry.contract(&to).is_none() {
                continue;
            }
            out.push(InternalCall {
                tx_hash: parsed.tx_hash.clone(),
                depth: node.depth,
                from: node.from,
                to,
                contract_name: node.contract_name.clone(),
                function: node.function_name.clone(),
                gas_used: node.gas_used,
            });
        }
    }
}

/// Whether the trace carries a supply-change call with one of `names`
fn has_supply_change(parsed: &ParsedTrace, names: &[&str]) -> bool {
    parsed.state_changes.iter().any(|c| {
        c.category == FunctionCategory::SupplyChange && names.contains(&c.function.as_str())
    })
}

/// Summary row for a transaction whose trace was unusable
fn failed_placeholder(tx_hash: &str) -> TxSummary {
    TxSummary {
        tx_hash: tx_hash.to_string(),
        tracked_interaction: false,
        is_transfer: false,
        is_mint: false,
        is_burn: false,
        gas_used: 0,
        failed: true,
        root_category: FunctionCategory::Other,
        transfer_count: 0,
    }
}

/// Pattern detection over the aggregated block data
fn detect_patterns(summaries: &[TxSummary], admin_calls: usize) -> Vec<BlockPattern> {
    let mut patterns = Vec::new();

    let mint_count = summaries.iter().filter(|s| s.is_mint).count();
    let burn_count = summaries.iter().filter(|s| s.is_burn).count();
    if mint_count > 0 && burn_count > 0 {
        patterns.push(BlockPattern::MintAndBurn {
            mint_count,
            burn_count,
        });
    }

    if admin_calls >= ADMIN_BURST_THRESHOLD {
        patterns.push(BlockPattern::AdminBurst {
            count: admin_calls,
            threshold: ADMIN_BURST_THRESHOLD,
        });
    }

    let tracked: Vec<&TxSummary> = summaries.iter().filter(|s| s.tracked_interaction).collect();
    if !tracked.is_empty() {
        let failed = tracked.iter().filter(|s| s.failed).count();
        let rate_percent = failed as f64 * 100.0 / tracked.len() as f64;
        if rate_percent > FAILURE_RATE_THRESHOLD {
            patterns.push(BlockPattern::HighFailureRate {
                failed,
                total: tracked.len(),
                rate_percent,
            });
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SignatureRegistry, PYUSD_ADDRESS};
    use serde_json::json;

    fn pyusd() -> String {
        format!("{PYUSD_ADDRESS}")
    }

    fn item(tx_hash: &str, value: serde_json::Value) -> BlockTraceItem {
        BlockTraceItem {
            tx_hash: tx_hash.to_string(),
            result: Some(serde_json::from_value(value).unwrap()),
        }
    }

    fn transfer_item(tx_hash: &str, amount: u64) -> BlockTraceItem {
        item(
            tx_hash,
            json!({
                "type": "CALL",
                "from": "0x00000000000000000000000000000000000000aa",
                "to": pyusd(),
                "gasUsed": "0xc350",
                "input": format!(
                    "0xa9059cbb{:0>64}{:064x}",
                    "00000000000000000000000000000000000000bb", amount
                )
            }),
        )
    }

    fn mint_item(tx_hash: &str) -> BlockTraceItem {
        item(
            tx_hash,
            json!({
                "type": "CALL",
                "from": "0x00000000000000000000000000000000000000aa",
                "to": pyusd(),
                "gasUsed": "0x9000",
                "input": format!(
                    "0x40c10f19{:0>64}{:064x}",
                    "00000000000000000000000000000000000000cc", 500u64
                )
            }),
        )
    }

    fn burn_item(tx_hash: &str) -> BlockTraceItem {
        item(
            tx_hash,
            json!({
                "type": "CALL",
                "from": "0x00000000000000000000000000000000000000aa",
                "to": pyusd(),
                "gasUsed": "0x8000",
                "input": format!("0x42966c68{:064x}", 300u64)
            }),
        )
    }

    #[test]
    fn summarizes_transactions_and_histogram() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let processor = BlockProcessor::new(&registry);

        let items = vec![transfer_item("0x1", 100), mint_item("0x2")];
        let analysis = processor.process(&items, 19_000_000);

        assert_eq!(analysis.block_number, 19_000_000);
        assert_eq!(analysis.summaries.len(), 2);
        assert!(analysis.summaries[0].is_transfer);
        assert!(analysis.summaries[0].tracked_interaction);
        assert!(analysis.summaries[1].is_mint);
        assert_eq!(
            analysis.category_histogram[&FunctionCategory::TokenMovement],
            1
        );
        assert_eq!(
            analysis.category_histogram[&FunctionCategory::SupplyChange],
            1
        );
    }

    #[test]
    fn duplicate_transfers_collapse() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let processor = BlockProcessor::new(&registry);

        // Same tx hash traced twice: identical decoded transfer
        let items = vec![transfer_item("0x1", 100), transfer_item("0x1", 100)];
        let analysis = processor.process(&items, 1);
        assert_eq!(analysis.transfers.len(), 1);
    }

    #[test]
    fn missing_result_degrades_to_placeholder() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let processor = BlockProcessor::new(&registry);

        let items = vec![
            BlockTraceItem {
                tx_hash: "0xdead".to_string(),
                result: None,
            },
            transfer_item("0x1", 5),
        ];
        let analysis = processor.process(&items, 1);

        assert_eq!(analysis.summaries.len(), 2);
        assert!(analysis.summaries[0].failed);
        assert!(analysis
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::MissingTraceResult { tx_hash } if tx_hash == "0xdead")));
    }

    #[test]
    fn mint_and_burn_in_one_block_flags() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let processor = BlockProcessor::new(&registry);

        let analysis = processor.process(&[mint_item("0x1"), burn_item("0x2")], 1);
        assert!(analysis
            .patterns
            .iter()
            .any(|p| matches!(p, BlockPattern::MintAndBurn { mint_count: 1, burn_count: 1 })));
    }

    #[test]
    fn high_failure_rate_flags() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let processor = BlockProcessor::new(&registry);

        let mut failing = transfer_item("0x1", 10);
        failing.result.as_mut().unwrap().error = Some("execution reverted".to_string());

        let items = vec![failing, transfer_item("0x2", 20), transfer_item("0x3", 30)];
        let analysis = processor.process(&items, 1);

        // 1 of 3 tracked transactions failed: 33% > 10%
        assert!(analysis.patterns.iter().any(|p| matches!(
            p,
            BlockPattern::HighFailureRate { failed: 1, total: 3, .. }
        )));
    }

    #[test]
    fn internal_calls_are_depth_tagged() {
        let registry = SignatureRegistry::pyusd_mainnet();
        let processor = BlockProcessor::new(&registry);

        let items = vec![item(
            "0x1",
            json!({
                "type": "CALL",
                "from": "0x00000000000000000000000000000000000000aa",
                "to": "0x00000000000000000000000000000000000000bb",
                "gasUsed": "0x5000",
                "calls": [{
                    "type": "CALL",
                    "from": "0x00000000000000000000000000000000000000bb",
                    "to": pyusd(),
                    "gasUsed": "0x2000",
                    "input": "0x18160ddd"
                }]
            }),
        )];

        let analysis = processor.process(&items, 1);
        assert_eq!(analysis.internal_calls.len(), 1);
        let call = &analysis.internal_calls[0];
        assert_eq!(call.depth, 1);
        assert_eq!(call.to, PYUSD_ADDRESS);
        assert_eq!(call.function.as_deref(), Some("totalSupply"));
    }
}
