//! # PYUSD Trace Analyzer
//!
//! A library for turning raw Ethereum debug traces into structured,
//! queryable analytics.
//!
//! ## Core Features
//!
//! - **Trace Parsing**
//!   - Nested call-tree flattening with parent/depth tracking
//!   - Opcode-level struct log annotation
//!   - Contract-context resolution during opcode replay
//!   - Revert reason extraction
//!
//! - **Classification**
//!   - Contract, selector, and event lookup against a signature registry
//!   - Fixed-offset calldata decoding for tracked token contracts
//!   - Opcode category grouping
//!
//! - **Aggregation**
//!   - Block-level summaries and pattern flags
//!   - Gas distributions, outliers, and cost conversion
//!   - Token-transfer graphs with topology metrics
//!   - Supply-history anomaly detection
//!   - Bounded result caching with pluggable eviction
//!
//! The engine is specialized for the PYUSD stablecoin contract set but
//! generic over any [`SignatureRegistry`]. It never executes bytecode:
//! every fact it reports is re-derived from data already present in
//! the trace.
//!
//! ## Example Usage
//!
//! ```rust
//! use pyusd_trace::{CallTraceParser, SignatureRegistry};
//! use serde_json::json;
//!
//! # fn example() -> anyhow::Result<()> {
//! let registry = SignatureRegistry::pyusd_mainnet();
//! let parser = CallTraceParser::new(&registry);
//!
//! // A callTracer frame as returned by debug_traceTransaction
//! let trace = json!({
//!     "type": "CALL",
//!     "from": "0xc255fc198eedac7af8af0f6e0ca781794b094a61",
//!     "to": "0x6c3ea9036406852006290770bedfcaba0e23a0e8",
//!     "gasUsed": "0xc350",
//!     "input": "0xa9059cbb\
//!               000000000000000000000000d878229c9c3575f224784de610911b5607a3ad15\
//!               00000000000000000000000000000000000000000000000000000000000f4240"
//! });
//!
//! let parsed = parser.parse_value(&trace, "0xtxhash")?;
//!
//! for transfer in &parsed.transfers {
//!     println!("{} -> {}: {}", transfer.from, transfer.to, transfer.amount);
//! }
//! for (category, gas) in &parsed.gas_by_category {
//!     println!("{category}: {gas} gas");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `registry`: Contract/function/event/opcode signature tables
//! - `parsers`: Call-trace and struct-log parsing
//! - `block`: Block-level batch processing
//! - `analysis`: Gas, transfer-network, and supply aggregation engines
//! - `cache`: Bounded result cache with background TTL sweeping
//! - `types`: Raw RPC frames and shared record types
//! - `errors`: Error types and handling

pub mod analysis;
pub mod block;
pub mod cache;
pub mod errors;
pub mod parsers;
pub mod registry;
pub mod types;
pub mod utils;

// Re-export only the essential types and entry points
pub use analysis::{GasAnalyzer, SupplyAnalyzer, TransferNetworkBuilder};
pub use block::BlockProcessor;
pub use cache::{CacheConfig, CacheKey, EvictionStrategy, TraceCache, TraceMethod};
pub use errors::TraceError;
pub use parsers::{CallTraceParser, StructLogParser};
pub use registry::SignatureRegistry;
