//! Process-wide metrics collector

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::collector::MetricsCollector;

static GLOBAL_COLLECTOR: Lazy<RwLock<Arc<MetricsCollector>>> =
    Lazy::new(|| RwLock::new(Arc::new(MetricsCollector::new())));

/// The shared collector, created on first use
pub fn metrics_collector() -> Arc<MetricsCollector> {
    Arc::clone(&GLOBAL_COLLECTOR.read())
}

/// Replace the shared collector with a fresh one
///
/// Handles obtained earlier keep pointing at the old collector.
#[cfg(any(test, feature = "test-utils"))]
pub fn reset_metrics_collector() -> Arc<MetricsCollector> {
    let fresh = Arc::new(MetricsCollector::new());
    *GLOBAL_COLLECTOR.write() = Arc::clone(&fresh);
    fresh
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Validates `reset_metrics_collector` behavior for the replacement
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms repeated calls share one instance.
    /// - Confirms the accessor returns the replacement afterwards.
    /// - Confirms the replacement starts empty.
    #[test]
    fn test_reset_replaces_instance() {
        let before = metrics_collector();
        assert!(Arc::ptr_eq(&before, &metrics_collector()));
        before.record_request("/api/v1/epics", "GET", Duration::from_millis(1), true);

        let fresh = reset_metrics_collector();

        assert!(Arc::ptr_eq(&fresh, &metrics_collector()));
        assert!(!Arc::ptr_eq(&before, &fresh));
        assert_eq!(fresh.get_request_count(), 0);
    }
}
