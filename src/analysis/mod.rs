//! Aggregation engines over parsed trace records
//!
//! # Modules
//!
//! - [`gas`]: gas distributions, per-category statistics, cost
//!   conversion, and rule-based optimization advisories
//! - [`transfer_network`]: directed weighted transfer graphs with
//!   topology metrics
//! - [`supply`]: supply time-series statistics and two-tier anomaly
//!   detection
//!
//! All engines are pure: empty input yields an empty report, never an
//! error, and no engine touches I/O or shared state.

/// Gas statistics and cost modelling
pub mod gas;

/// Supply history anomaly detection
pub mod supply;

/// Transfer graph construction and topology
pub mod transfer_network;

pub use gas::{CategoryGasStats, CostParams, CostSummary, GasAnalyzer, GasReport};
pub use supply::{SupplyAnalysis, SupplyAnalyzer, SupplyDataPoint, SupplyEvent, SupplyEventKind};
pub use transfer_network::{
    NetworkEdge, NetworkNode, NodeRole, TopologyReport, TransferNetwork, TransferNetworkBuilder,
};
