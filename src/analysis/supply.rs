//! Supply history statistics and anomaly detection
//!
//! Consumes a block-ordered series of raw supply snapshots and flags
//! out-of-pattern behavior with a two-tier model:
//!
//! - **Per point**: a trailing moving average and standard deviation
//!   over a `min(10, n/5)` window form a `mean ± k·σ` band; a point
//!   outside its band is anomalous. This asks "is the series currently
//!   out of its recent range?"
//! - **Per event**: the delta between consecutive points is classified
//!   (mint/burn/transfer) and compared against the *global* mean and σ
//!   of all event magnitudes. This asks "was this change unusually
//!   large?"
//!
//! The two tiers are deliberately distinct and must not be merged.

use alloy::primitives::U256;
use serde::Serialize;

use crate::types::Severity;

/// Default anomaly threshold in standard deviations
pub const DEFAULT_ANOMALY_SIGMA: f64 = 2.0;

/// Rolling window never grows past this many points
const WINDOW_CAP: usize = 10;

/// One raw supply snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SupplyDataPoint {
    /// Block the snapshot was taken at
    pub block_number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Raw supply value in base token units
    pub raw_value: U256,
}

/// Direction classification of a supply delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyEventKind {
    /// Supply increased
    Mint,
    /// Supply decreased
    Burn,
    /// Supply unchanged (movement without net change)
    Transfer,
    /// Direction could not be determined
    Unknown,
}

/// One discrete change between consecutive snapshots
#[derive(Debug, Clone, Serialize)]
pub struct SupplyEvent {
    /// Block of the later snapshot
    pub block_number: u64,
    /// Direction of the change
    pub kind: SupplyEventKind,
    /// Magnitude of the change
    pub amount: U256,
    /// Change relative to the previous value, in percent
    pub growth_rate_percent: f64,
    /// Whether the magnitude is unusually large globally
    pub is_anomaly: bool,
    /// Severity hint for presentation layers
    pub severity: Severity,
}

/// Rolling statistics for one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SupplyPointStats {
    /// Block of the snapshot
    pub block_number: u64,
    /// Raw value of the snapshot
    pub value: U256,
    /// Trailing window mean
    pub moving_avg: f64,
    /// Trailing window standard deviation
    pub std_dev: f64,
    /// `moving_avg + k·σ`
    pub upper_bound: f64,
    /// `moving_avg - k·σ`
    pub lower_bound: f64,
    /// Whether the value sits outside its band
    pub is_anomaly: bool,
}

/// Aggregate counters over one analysis
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupplySummary {
    /// Snapshots analyzed
    pub total_points: usize,
    /// Smallest supply observed
    pub min_value: U256,
    /// Largest supply observed
    pub max_value: U256,
    /// Supply-increasing events
    pub mint_events: usize,
    /// Supply-decreasing events
    pub burn_events: usize,
    /// Points flagged by the rolling band
    pub anomalous_points: usize,
    /// Events flagged by the global model
    pub anomalous_events: usize,
}

/// Complete supply history analysis
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupplyAnalysis {
    /// Per-point rolling statistics, in input order
    pub points: Vec<SupplyPointStats>,
    /// Discrete events between consecutive points
    pub events: Vec<SupplyEvent>,
    /// Aggregate counters
    pub summary: SupplySummary,
}

/// Supply history analyzer
#[derive(Debug, Clone)]
pub struct SupplyAnalyzer {
    anomaly_sigma: f64,
}

impl Default for SupplyAnalyzer {
    fn default() -> Self {
        Self {
            anomaly_sigma: DEFAULT_ANOMALY_SIGMA,
        }
    }
}

impl SupplyAnalyzer {
    /// Analyzer with the default 2.0σ threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the anomaly threshold (in standard deviations)
    pub fn with_anomaly_sigma(mut self, sigma: f64) -> Self {
        self.anomaly_sigma = sigma.max(0.0);
        self
    }

    /// Analyze a block-ordered snapshot series
    ///
    /// Never errors: empty input yields an empty analysis, a single
    /// point yields one trivially in-band point and no events.
    pub fn analyze(&self, points: &[SupplyDataPoint]) -> SupplyAnalysis {
        if points.is_empty() {
            return SupplyAnalysis::default();
        }

        let window = (points.len() / 5).clamp(1, WINDOW_CAP);
        let values: Vec<f64> = points.iter().map(|p| to_f64(p.raw_value)).collect();

        let point_stats: Vec<SupplyPointStats> = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let start = (i + 1).saturating_sub(window);
                let (mean, std_dev) = mean_and_std(&values[start..=i]);
                let upper_bound = mean + self.anomaly_sigma * std_dev;
                let lower_bound = mean - self.anomaly_sigma * std_dev;
                let value = values[i];
                SupplyPointStats {
                    block_number: point.block_number,
                    value: point.raw_value,
                    moving_avg: mean,
                    std_dev,
                    upper_bound,
                    lower_bound,
                    is_anomaly: value > upper_bound || value < lower_bound,
                }
            })
            .collect();

        let events = self.classify_events(points, &values);

        let summary = SupplySummary {
            total_points: points.len(),
            min_value: points.iter().map(|p| p.raw_value).min().unwrap_or_default(),
            max_value: points.iter().map(|p| p.raw_value).max().unwrap_or_default(),
            mint_events: events
                .iter()
                .filter(|e| e.kind == SupplyEventKind::Mint)
                .count(),
            burn_events: events
                .iter()
                .filter(|e| e.kind == SupplyEventKind::Burn)
                .count(),
            anomalous_points: point_stats.iter().filter(|p| p.is_anomaly).count(),
            anomalous_events: events.iter().filter(|e| e.is_anomaly).count(),
        };

        SupplyAnalysis {
            points: point_stats,
            events,
            summary,
        }
    }

    /// Classify consecutive deltas and flag them against the global
    /// magnitude distribution
    fn classify_events(&self, points: &[SupplyDataPoint], values: &[f64]) -> Vec<SupplyEvent> {
        if points.len() < 2 {
            return Vec::new();
        }

        let magnitudes: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let (global_mean, global_std) = mean_and_std(&magnitudes);
        let threshold = global_mean + self.anomaly_sigma * global_std;

        points
            .windows(2)
            .zip(magnitudes)
            .map(|(pair, magnitude)| {
                let (prev, current) = (&pair[0], &pair[1]);
                let (kind, amount) = if current.raw_value > prev.raw_value {
                    (SupplyEventKind::Mint, current.raw_value - prev.raw_value)
                } else if current.raw_value < prev.raw_value {
                    (SupplyEventKind::Burn, prev.raw_value - current.raw_value)
                } else {
                    (SupplyEventKind::Transfer, U256::ZERO)
                };

                let prev_value = to_f64(prev.raw_value);
                let growth_rate_percent = if prev_value == 0.0 {
                    0.0
                } else {
                    (to_f64(current.raw_value) - prev_value) * 100.0 / prev_value
                };

                let is_anomaly = magnitude > threshold;
                SupplyEvent {
                    block_number: current.block_number,
                    kind,
                    amount,
                    growth_rate_percent,
                    is_anomaly,
                    severity: if is_anomaly {
                        Severity::Warning
                    } else {
                        Severity::Info
                    },
                }
            })
            .collect()
    }
}

/// Population mean and standard deviation of a non-empty slice
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / values.len() as f64;
    (mean, variance.sqrt())
}

/// Lossy conversion for statistics; saturates above `u128::MAX`
fn to_f64(value: U256) -> f64 {
    u128::try_from(value).map(|v| v as f64).unwrap_or(u128::MAX as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[u64]) -> Vec<SupplyDataPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SupplyDataPoint {
                block_number: 1_000 + i as u64,
                timestamp: 1_700_000_000 + i as u64 * 12,
                raw_value: U256::from(*v),
            })
            .collect()
    }

    #[test]
    fn empty_and_single_point_inputs_are_fine() {
        let analyzer = SupplyAnalyzer::new();

        let empty = analyzer.analyze(&[]);
        assert!(empty.points.is_empty());
        assert!(empty.events.is_empty());

        let single = analyzer.analyze(&series(&[1_000]));
        assert_eq!(single.points.len(), 1);
        assert!(!single.points[0].is_anomaly);
        assert!(single.events.is_empty());
    }

    #[test]
    fn constant_series_has_no_anomalies() {
        let analyzer = SupplyAnalyzer::new();
        let analysis = analyzer.analyze(&series(&[500; 40]));

        assert!(analysis.points.iter().all(|p| !p.is_anomaly));
        assert!(analysis.events.iter().all(|e| !e.is_anomaly));
        assert_eq!(analysis.summary.anomalous_points, 0);
        assert_eq!(analysis.summary.anomalous_events, 0);
        // Bounds collapse onto the mean
        assert_eq!(analysis.points[20].upper_bound, 500.0);
        assert_eq!(analysis.points[20].lower_bound, 500.0);
    }

    #[test]
    fn events_classify_by_direction() {
        let analyzer = SupplyAnalyzer::new();
        let analysis = analyzer.analyze(&series(&[100, 150, 120, 120]));

        assert_eq!(analysis.events.len(), 3);
        assert_eq!(analysis.events[0].kind, SupplyEventKind::Mint);
        assert_eq!(analysis.events[0].amount, U256::from(50));
        assert!((analysis.events[0].growth_rate_percent - 50.0).abs() < 1e-9);

        assert_eq!(analysis.events[1].kind, SupplyEventKind::Burn);
        assert_eq!(analysis.events[1].amount, U256::from(30));

        assert_eq!(analysis.events[2].kind, SupplyEventKind::Transfer);
        assert_eq!(analysis.events[2].amount, U256::ZERO);

        assert_eq!(analysis.summary.mint_events, 1);
        assert_eq!(analysis.summary.burn_events, 1);
    }

    #[test]
    fn spike_breaks_the_rolling_band() {
        // Long flat stretch, then a large jump
        let mut values = vec![1_000u64; 30];
        values.push(5_000);
        let analysis = SupplyAnalyzer::new().analyze(&series(&values));

        let last = analysis.points.last().unwrap();
        assert!(last.is_anomaly);
        // Every flat point stays in band
        assert_eq!(analysis.summary.anomalous_points, 1);
    }

    #[test]
    fn outsized_event_flags_against_global_distribution() {
        // Steady +10 drip with one +500 jump
        let values = [100, 110, 120, 130, 140, 640, 650, 660, 670, 680];
        let analysis = SupplyAnalyzer::new().analyze(&series(&values));

        let flagged: Vec<&SupplyEvent> =
            analysis.events.iter().filter(|e| e.is_anomaly).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].amount, U256::from(500));
        assert_eq!(flagged[0].severity, Severity::Warning);
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = SupplyAnalyzer::new().with_anomaly_sigma(0.5);
        let lenient = SupplyAnalyzer::new().with_anomaly_sigma(10.0);
        let values = [100, 110, 120, 130, 140, 640, 650, 660, 670, 680];

        let strict_count = strict.analyze(&series(&values)).summary.anomalous_events;
        let lenient_count = lenient.analyze(&series(&values)).summary.anomalous_events;
        assert!(strict_count >= 1);
        assert_eq!(lenient_count, 0);
    }
}
