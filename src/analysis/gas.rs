//! Gas aggregation and cost modelling
//!
//! Pure computation over already-parsed transaction summaries: totals,
//! outliers, per-category statistics with incremental means, a
//! caller-priced cost model, and rule-based optimization advisories.
//! Nothing here fetches prices or touches state; the caller supplies
//! the gas price and an optional currency rate.

use std::collections::BTreeMap;

use alloy::primitives::U256;
use serde::Serialize;

use crate::block::{InternalCall, TxSummary};
use crate::types::{Advisory, AdvisoryCode, FunctionCategory, Severity};

/// High-gas outlier threshold as a multiple of the average
const HIGH_GAS_MULTIPLIER: f64 = 2.0;

/// Per-category max/avg ratio that flags variance
const VARIANCE_MULTIPLIER: f64 = 2.0;

/// Internal call depth beyond which chains are flagged
const MAX_RECOMMENDED_DEPTH: usize = 3;

/// Average gas per transaction above which optimization is suggested
const HIGH_AVERAGE_GAS: f64 = 100_000.0;

/// Wei per gwei
const GWEI: f64 = 1e9;

/// Caller-supplied pricing inputs for the cost model
#[derive(Debug, Clone, Default)]
pub struct CostParams {
    /// Gas price in gwei
    pub gas_price_gwei: f64,
    /// Optional native-token price for currency conversion
    pub currency_rate: Option<f64>,
}

/// Gas statistics for one function category
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryGasStats {
    /// Transactions observed in this category
    pub count: u64,
    /// Sum of gas across those transactions
    pub total_gas: u64,
    /// Running average, updated incrementally per observation
    pub avg_gas: f64,
    /// Smallest single observation
    pub min_gas: u64,
    /// Largest single observation
    pub max_gas: u64,
}

impl CategoryGasStats {
    /// Fold one observation into the stats
    fn observe(&mut self, gas: u64) {
        self.count += 1;
        self.total_gas += gas;
        self.avg_gas += (gas as f64 - self.avg_gas) / self.count as f64;
        self.min_gas = if self.count == 1 {
            gas
        } else {
            self.min_gas.min(gas)
        };
        self.max_gas = self.max_gas.max(gas);
    }
}

/// Cost of the analyzed gas at the supplied price
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostSummary {
    /// Price used for the conversion, in gwei
    pub gas_price_gwei: f64,
    /// Total cost in wei
    pub total_cost_wei: U256,
    /// Total cost in native token units
    pub total_cost_native: f64,
    /// Currency rate used, when one was supplied
    pub currency_rate: Option<f64>,
    /// Total cost in the supplied currency
    pub total_cost_currency: Option<f64>,
}

/// Complete gas analysis output
#[derive(Debug, Clone, Default, Serialize)]
pub struct GasReport {
    /// Sum of gas across all transactions
    pub total_gas: u64,
    /// Mean gas per transaction
    pub average_gas: f64,
    /// Outlier threshold applied (`2 x average`)
    pub high_gas_threshold: f64,
    /// Hashes of transactions above the threshold
    pub high_gas_txs: Vec<String>,
    /// Per-category statistics
    pub by_category: BTreeMap<FunctionCategory, CategoryGasStats>,
    /// Cost conversion at the supplied price
    pub cost: CostSummary,
    /// Rule-based findings for the presentation layer
    pub advisories: Vec<Advisory>,
}

/// Gas analysis engine
///
/// Holds only pricing inputs; `analyze` is pure and reentrant.
#[derive(Debug, Clone, Default)]
pub struct GasAnalyzer {
    cost: CostParams,
}

impl GasAnalyzer {
    /// Create an analyzer with the given pricing inputs
    pub fn new(cost: CostParams) -> Self {
        Self { cost }
    }

    /// Aggregate gas statistics over a transaction summary list
    ///
    /// Empty input yields a zeroed report; this method never errors.
    pub fn analyze(
        &self,
        summaries: &[TxSummary],
        internal_calls: Option<&[InternalCall]>,
    ) -> GasReport {
        if summaries.is_empty() {
            return GasReport::default();
        }

        let total_gas: u64 = summaries.iter().map(|s| s.gas_used).sum();
        let average_gas = total_gas as f64 / summaries.len() as f64;
        let high_gas_threshold = average_gas * HIGH_GAS_MULTIPLIER;

        let high_gas_txs: Vec<String> = summaries
            .iter()
            .filter(|s| (s.gas_used as f64) > high_gas_threshold)
            .map(|s| s.tx_hash.clone())
            .collect();

        let mut by_category: BTreeMap<FunctionCategory, CategoryGasStats> = BTreeMap::new();
        for summary in summaries {
            by_category
                .entry(summary.root_category)
                .or_default()
                .observe(summary.gas_used);
        }

        let advisories = self.advisories(summaries, internal_calls, average_gas, &by_category);

        GasReport {
            total_gas,
            average_gas,
            high_gas_threshold,
            high_gas_txs,
            by_category,
            cost: self.cost_summary(total_gas),
            advisories,
        }
    }

    /// Convert a gas total into wei/native/currency at the given price
    fn cost_summary(&self, total_gas: u64) -> CostSummary {
        let wei_per_gas = (self.cost.gas_price_gwei * GWEI).max(0.0) as u128;
        let total_cost_wei = U256::from(total_gas as u128 * wei_per_gas);
        let total_cost_native = total_gas as f64 * self.cost.gas_price_gwei / GWEI;
        let total_cost_currency = self.cost.currency_rate.map(|rate| total_cost_native * rate);

        CostSummary {
            gas_price_gwei: self.cost.gas_price_gwei,
            total_cost_wei,
            total_cost_native,
            currency_rate: self.cost.currency_rate,
            total_cost_currency,
        }
    }

    /// Rule-based heuristics, emitted as structured records
    fn advisories(
        &self,
        summaries: &[TxSummary],
        internal_calls: Option<&[InternalCall]>,
        average_gas: f64,
        by_category: &BTreeMap<FunctionCategory, CategoryGasStats>,
    ) -> Vec<Advisory> {
        let mut advisories = Vec::new();

        let failed: Vec<&TxSummary> = summaries.iter().filter(|s| s.failed).collect();
        let wasted_gas: u64 = failed.iter().map(|s| s.gas_used).sum();
        if wasted_gas > 0 {
            advisories.push(Advisory::new(
                AdvisoryCode::FailedTransactionWaste,
                Severity::Warning,
                [
                    ("wasted_gas", wasted_gas.to_string()),
                    ("failed_count", failed.len().to_string()),
                ],
            ));
        }

        for (category, stats) in by_category {
            if stats.count >= 2 && stats.max_gas as f64 > stats.avg_gas * VARIANCE_MULTIPLIER {
                advisories.push(Advisory::new(
                    AdvisoryCode::HighGasVariance,
                    Severity::Warning,
                    [
                        ("category", category.to_string()),
                        ("max_gas", stats.max_gas.to_string()),
                        ("avg_gas", format!("{:.0}", stats.avg_gas)),
                    ],
                ));
            }
        }

        if let Some(calls) = internal_calls {
            let deepest = calls.iter().map(|c| c.depth).max().unwrap_or(0);
            if deepest > MAX_RECOMMENDED_DEPTH {
                let count = calls.iter().filter(|c| c.depth > MAX_RECOMMENDED_DEPTH).count();
                advisories.push(Advisory::new(
                    AdvisoryCode::DeepCallChain,
                    Severity::Info,
                    [
                        ("max_depth", deepest.to_string()),
                        ("calls_beyond_limit", count.to_string()),
                    ],
                ));
            }
        }

        if average_gas > HIGH_AVERAGE_GAS {
            advisories.push(Advisory::new(
                AdvisoryCode::HighAverageGas,
                Severity::Info,
                [("average_gas", format!("{average_gas:.0}"))],
            ));
        }

        advisories
    }
}
