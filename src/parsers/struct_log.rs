//! Opcode step parsing with per-depth contract context
//!
//! Walks the flat step array a `structLogger` trace returns and
//! annotates every step with:
//! - The gas delta actually paid (`max(0, prev_gas - gas)`)
//! - Its opcode category
//! - The contract executing at its depth, resolved by watching
//!   CALL-family ops push callee addresses onto deeper depths
//!
//! Contexts deeper than the current step are cleared whenever depth
//! decreases, so a returned frame's callee cannot leak into a later
//! call at the same depth. Re-entrant calls at one depth overwrite.

use std::collections::{BTreeMap, HashMap};

use alloy::primitives::Address;
use serde::Serialize;
use tracing::debug;

use crate::errors::TraceError;
use crate::registry::{categorize_opcode, OpcodeCategory, SignatureRegistry};
use crate::types::{ParseWarning, RawStructLogStep};
use crate::utils::stack_utils::{callee_slot, decode_stack_address};

/// Number of entries in the top-opcode and top-category breakdowns
const TOP_BREAKDOWN: usize = 10;

/// EVM memory is reported as 32-byte hex words
const MEMORY_WORD_BYTES: usize = 32;

/// One annotated opcode step
#[derive(Debug, Clone, Serialize)]
pub struct StructLogStep {
    /// Position in the step array
    pub step_index: usize,
    /// Program counter
    pub pc: u64,
    /// Opcode mnemonic
    pub op: String,
    /// Category group of the opcode
    pub category: OpcodeCategory,
    /// Gas remaining before the step
    pub gas: u64,
    /// Gas paid by the previous step to reach this one
    pub gas_cost: u64,
    /// Call depth the step executed at
    pub depth: u64,
    /// Stack size at the step
    pub stack_depth: usize,
    /// Memory size in bytes at the step
    pub mem_size_bytes: usize,
    /// Contract executing at this depth, when resolvable
    pub current_contract: Option<Address>,
    /// Whether that contract belongs to the tracked registry set
    pub is_tracked_contract: bool,
}

/// Aggregate summary over one struct log
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructLogSummary {
    /// Total steps processed
    pub total_steps: usize,
    /// Deepest call depth observed
    pub max_depth: u64,
    /// Largest stack seen on any step
    pub max_stack_depth: usize,
    /// Largest memory size seen on any step, in bytes
    pub max_memory_bytes: usize,
    /// Sum of per-step gas deltas
    pub total_gas_cost: u64,
    /// Steps executing inside tracked contracts
    pub tracked_steps: usize,
    /// `tracked_steps` as a percentage of all steps
    pub tracked_percentage: f64,
}

/// Complete output of one struct-log parse
#[derive(Debug, Clone, Serialize)]
pub struct StructLogTrace {
    /// Annotated steps in execution order
    pub steps: Vec<StructLogStep>,
    /// Aggregate counters
    pub summary: StructLogSummary,
    /// Top opcodes by accumulated gas, descending
    pub top_opcodes: Vec<(String, u64)>,
    /// Top categories by accumulated gas, descending
    pub top_categories: Vec<(OpcodeCategory, u64)>,
    /// Data-quality notes collected along the way
    pub warnings: Vec<ParseWarning>,
}

/// Parser for `structLogger` step arrays
pub struct StructLogParser<'a> {
    registry: &'a SignatureRegistry,
}

impl<'a> StructLogParser<'a> {
    /// Create a parser over the given registry
    pub fn new(registry: &'a SignatureRegistry) -> Self {
        Self { registry }
    }

    /// Parse an ordered step array into annotated steps and summaries
    ///
    /// # Errors
    /// [`TraceError::EmptyStructLog`] when the array is empty; a trace
    /// with no steps means the RPC collaborator supplied nothing
    /// usable.
    pub fn parse(&self, raw_steps: &[RawStructLogStep]) -> Result<StructLogTrace, TraceError> {
        if raw_steps.is_empty() {
            return Err(TraceError::EmptyStructLog(
                "zero steps in struct log".to_string(),
            ));
        }

        let mut steps = Vec::with_capacity(raw_steps.len());
        let mut warnings = Vec::new();
        let mut current_contracts: HashMap<u64, Address> = HashMap::new();
        let mut gas_by_opcode: BTreeMap<String, u64> = BTreeMap::new();
        let mut gas_by_category: BTreeMap<OpcodeCategory, u64> = BTreeMap::new();

        let mut summary = StructLogSummary::default();
        let mut last_gas = raw_steps[0].gas;
        let mut last_depth = raw_steps[0].depth;

        for (step_index, raw) in raw_steps.iter().enumerate() {
            // A depth decrease means one or more frames returned;
            // their contexts must not survive into later calls.
            if raw.depth < last_depth {
                current_contracts.retain(|d, _| *d <= raw.depth);
            }
            last_depth = raw.depth;

            let gas_cost = last_gas.saturating_sub(raw.gas);
            last_gas = raw.gas;

            // CALL-family ops publish the callee for the next depth
            if matches!(raw.op.as_str(), "CALL" | "STATICCALL" | "DELEGATECALL") {
                if let Some(stack) = &raw.stack {
                    if let Some(slot) = callee_slot(stack) {
                        match decode_stack_address(slot) {
                            Ok(callee) => {
                                current_contracts.insert(raw.depth + 1, callee);
                            }
                            Err(err) => {
                                debug!(step_index, %err, "dropping contract context");
                                warnings.push(ParseWarning::StackAddressUndecodable {
                                    step_index,
                                    reason: err.to_string(),
                                });
                            }
                        }
                    }
                }
            }

            let current_contract = current_contracts.get(&raw.depth).copied();
            let is_tracked_contract = current_contract
                .map(|addr| self.registry.is_tracked(&addr))
                .unwrap_or(false);

            let category = categorize_opcode(&raw.op);
            let stack_depth = raw.stack.as_ref().map(|s| s.len()).unwrap_or(0);
            let mem_size_bytes = raw
                .memory
                .as_ref()
                .map(|m| m.len() * MEMORY_WORD_BYTES)
                .unwrap_or(0);

            summary.total_steps += 1;
            summary.max_depth = summary.max_depth.max(raw.depth);
            summary.max_stack_depth = summary.max_stack_depth.max(stack_depth);
            summary.max_memory_bytes = summary.max_memory_bytes.max(mem_size_bytes);
            summary.total_gas_cost += gas_cost;
            if is_tracked_contract {
                summary.tracked_steps += 1;
            }

            *gas_by_opcode.entry(raw.op.clone()).or_insert(0) += gas_cost;
            *gas_by_category.entry(category).or_insert(0) += gas_cost;

            steps.push(StructLogStep {
                step_index,
                pc: raw.pc,
                op: raw.op.clone(),
                category,
                gas: raw.gas,
                gas_cost,
                depth: raw.depth,
                stack_depth,
                mem_size_bytes,
                current_contract,
                is_tracked_contract,
            });
        }

        summary.tracked_percentage = if summary.total_steps == 0 {
            0.0
        } else {
            summary.tracked_steps as f64 * 100.0 / summary.total_steps as f64
        };

        Ok(StructLogTrace {
            steps,
            summary,
            top_opcodes: top_n(gas_by_opcode),
            top_categories: top_n(gas_by_category),
            warnings,
        })
    }
}

/// Highest-gas entries of a breakdown map, descending, capped
fn top_n<K: Clone>(map: BTreeMap<K, u64>) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, u64)> = map.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(TOP_BREAKDOWN);
    entries
}
