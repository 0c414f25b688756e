//! Trace parsers: raw RPC payloads into normalized records
//!
//! Two parsers cover the two debug-trace shapes a node can return:
//!
//! - [`call_trace`]: nested `callTracer` trees -> flat call-node lists
//!   with decoded logs, transfers, and gas attribution
//! - [`struct_log`]: flat `structLogger` step arrays -> annotated steps
//!   with per-depth contract context and opcode gas breakdowns
//!
//! Both are pure and reentrant: all counters live on the call stack of
//! `parse`, so any number of concurrent invocations may share one
//! parser over the same registry.

/// Call tree parsing
pub mod call_trace;

/// Opcode step parsing
pub mod struct_log;

pub use call_trace::{CallTraceNode, CallTraceParser, LogEntry, ParsedTrace, TraceStats};
pub use struct_log::{StructLogParser, StructLogStep, StructLogSummary, StructLogTrace};
