//! Metrics aggregation for outbound API traffic

pub mod collector;
pub mod global;

pub use collector::{
    CacheStats, MetricsCollector, MetricsConfig, MetricsSnapshot, RequestRecord,
};
#[cfg(any(test, feature = "test-utils"))]
pub use global::reset_metrics_collector;
pub use global::metrics_collector;
