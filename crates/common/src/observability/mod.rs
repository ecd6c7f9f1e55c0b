//! Observability primitives
//!
//! Request, error and cache metrics live in [`metrics`]. Logging goes
//! through `tracing` throughout the crate; subscriber installation is left
//! to the binary (see `taiga-mcp-infra::logging`).

pub mod metrics;

pub use metrics::{
    metrics_collector, CacheStats, MetricsCollector, MetricsConfig, MetricsSnapshot,
    RequestRecord,
};
#[cfg(any(test, feature = "test-utils"))]
pub use metrics::reset_metrics_collector;
