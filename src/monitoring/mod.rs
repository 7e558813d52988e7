//! Monitoring and observability
//!
//! The gateway self-tracks request, usage, and session metrics in process;
//! there is no external metrics backend.

pub mod metrics;

pub use metrics::{CostBreakdown, MetricsCollector, MetricsSnapshot, SessionGuard};
