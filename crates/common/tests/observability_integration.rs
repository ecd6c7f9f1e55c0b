//! Integration tests for metrics collection

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use taiga_mcp_common::observability::{
    metrics_collector, reset_metrics_collector, MetricsCollector, MetricsConfig,
};

/// Validates that snapshots stay consistent while writers are active.
///
/// # Test Steps
/// 1. Spawn writer tasks recording successes, failures and errors
/// 2. Take snapshots concurrently
/// 3. Verify every snapshot satisfies `successful + failed == total`
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshots_are_consistent_under_writes() {
    let metrics = Arc::new(MetricsCollector::new());

    let writers: Vec<_> = (0..4)
        .map(|worker| {
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                for i in 0..250 {
                    let success = (i + worker) % 5 != 0;
                    metrics.record_request("/api/v1/tasks", "GET", Duration::from_millis(2), success);
                    if !success {
                        metrics.record_error("transient_remote");
                    }
                    if i % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    let reader = {
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            for _ in 0..50 {
                let snapshot = metrics.get_snapshot();
                assert_eq!(
                    snapshot.successful_requests + snapshot.failed_requests,
                    snapshot.total_requests
                );
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        writer.await.expect("writer panicked");
    }
    reader.await.expect("reader panicked");

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.total_requests, 1000);
    assert_eq!(snapshot.failed_requests, 200);
    assert_eq!(metrics.get_error_count(Some("transient_remote")), 200);
    assert!((snapshot.avg_response_time_ms - 2.0).abs() < 1e-6);
}

/// Validates the serialized snapshot shape consumed by MCP resources.
#[test]
fn test_snapshot_serializes_to_json() {
    let metrics = MetricsCollector::with_config(MetricsConfig {
        slow_request_threshold: Duration::from_millis(50),
    })
    .expect("valid config");
    metrics.record_request("/api/v1/projects", "GET", Duration::from_millis(100), true);
    metrics.record_cache_hit();

    let value = serde_json::to_value(metrics.get_snapshot()).expect("snapshot serializes");

    assert_eq!(value["total_requests"], 1);
    assert_eq!(value["cache_hit_rate"], 1.0);
    assert_eq!(value["requests_by_endpoint"]["/api/v1/projects"], 1);
    assert!(value["timestamp"].is_string());
}

/// Validates the process-wide accessor and its test reset hook.
#[test]
fn test_global_collector_reset() {
    let fresh = reset_metrics_collector();
    metrics_collector().record_error("not_found");

    assert_eq!(fresh.get_error_count(Some("not_found")), 1);

    let replacement = reset_metrics_collector();
    assert_eq!(replacement.get_error_count(None), 0);
    assert_eq!(fresh.get_error_count(None), 1);
}
