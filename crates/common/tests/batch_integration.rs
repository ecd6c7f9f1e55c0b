//! Integration tests for the batch executor
//!
//! Covers the concurrency ceiling under a multi-threaded runtime and the
//! full fan-out composition (batch → retry → rate limiter).

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use taiga_mcp_common::batch::{BatchConfig, BatchExecutor, BatchProgress};
use taiga_mcp_common::error::ApiError;
use taiga_mcp_common::resilience::{
    RateLimiter, RateLimiterConfig, RetryConfig, RetryExecutor, RetryPolicy,
};
use taiga_mcp_common::testing::{ConcurrencyProbe, FlakyOperation};

fn executor(max_concurrency: usize, fail_fast: bool) -> BatchExecutor {
    let config = BatchConfig::builder()
        .max_concurrency(max_concurrency)
        .fail_fast(fail_fast)
        .build()
        .expect("valid batch config");
    BatchExecutor::new(config).expect("valid executor")
}

/// Validates the concurrency ceiling with many slow operations.
///
/// # Test Steps
/// 1. Run 40 operations that each sleep 10ms with a ceiling of 4
/// 2. Verify the probe never saw more than 4 overlapping operations
/// 3. Verify all 40 ran and all succeeded in order
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrency_never_exceeds_ceiling() {
    let probe = ConcurrencyProbe::new();
    let executor = executor(4, false);

    let result = executor
        .execute((0..40).collect::<Vec<u32>>(), |n| {
            let probe = probe.clone();
            async move {
                let _guard = probe.enter();
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(n)
            }
        })
        .await
        .expect("continue mode returns Ok");

    assert!(probe.peak() <= 4, "peak concurrency {} exceeded ceiling", probe.peak());
    assert_eq!(probe.entered(), 40);
    assert_eq!(result.success_count(), 40);
    let outputs: Vec<u32> = result.successful_results().into_iter().copied().collect();
    assert_eq!(outputs, (0..40).collect::<Vec<_>>());
}

/// Validates progress reporting for a batch with failures.
///
/// # Test Steps
/// 1. Run 10 items where every third fails
/// 2. Collect every published snapshot
/// 3. Verify processed counts never decrease and the last snapshot is final
#[tokio::test(flavor = "multi_thread")]
async fn test_progress_is_monotonic() {
    let snapshots: Arc<Mutex<Vec<BatchProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);
    let executor =
        executor(3, false).with_progress_callback(move |progress| sink.lock().push(progress));

    let result = executor
        .execute((0..10).collect::<Vec<u32>>(), |n| async move {
            tokio::time::sleep(Duration::from_millis(u64::from(n % 4))).await;
            if n % 3 == 0 {
                Err(ApiError::not_found_with_id("UserStory", n.to_string()))
            } else {
                Ok(n)
            }
        })
        .await
        .expect("continue mode returns Ok");

    let snapshots = snapshots.lock();
    assert_eq!(snapshots.len(), 20);
    assert!(snapshots.windows(2).all(|pair| pair[0].processed() <= pair[1].processed()));

    let last = snapshots.last().copied().expect("at least one snapshot");
    assert!(last.is_complete());
    assert_eq!(last.failed, result.failure_count());
    assert_eq!(last.completed, result.success_count());
    assert_eq!(result.failure_count(), 4);
}

/// Validates batch fan-out over retrying, rate-limited calls.
///
/// # Test Steps
/// 1. Give each of 8 items its own flaky operation failing once
/// 2. Run each item through rate limiter admission inside the retry loop
/// 3. Verify every item succeeds and each operation was called twice
#[tokio::test(flavor = "multi_thread")]
async fn test_batch_of_retrying_calls() {
    let limiter = RateLimiter::new(
        RateLimiterConfig::builder()
            .max_requests_per_second(200.0)
            .burst_size(20.0)
            .build()
            .expect("valid limiter config"),
    )
    .expect("valid limiter");
    let retry = RetryExecutor::new(
        RetryPolicy::new(
            RetryConfig::builder()
                .base_delay(Duration::from_millis(2))
                .build()
                .expect("valid retry config"),
        )
        .expect("valid policy"),
    );
    let operations: Vec<FlakyOperation> =
        (0..8).map(|_| FlakyOperation::new(1, ApiError::transient("timeout"))).collect();

    let result = executor(4, true)
        .execute(operations.clone(), |operation| {
            let limiter = &limiter;
            let retry = &retry;
            async move {
                retry.execute("update_task", || limiter.run(|| operation.call())).await
            }
        })
        .await
        .expect("every item eventually succeeds");

    assert!(result.is_success());
    assert!(result.successful_results().iter().all(|&&call| call == 2));
    assert!(operations.iter().all(|operation| operation.calls() == 2));
    assert_eq!(limiter.stats().total_requests, 16);
}

/// Validates fail-fast returns the first failure and stops the batch.
#[tokio::test(flavor = "multi_thread")]
async fn test_fail_fast_surfaces_error() {
    let probe = ConcurrencyProbe::new();
    let result = executor(2, true)
        .execute((0..50).collect::<Vec<u32>>(), |n| {
            let probe = probe.clone();
            async move {
                let _guard = probe.enter();
                tokio::time::sleep(Duration::from_millis(5)).await;
                if n == 3 {
                    Err(ApiError::validation_field("subject", "required"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert_eq!(result, Err(ApiError::validation_field("subject", "required")));
    assert!(probe.entered() < 50);
}

/// Validates the concurrency ceiling across several limits.
///
/// # Test Steps
/// 1. For each ceiling in 1, 2, 3, 5 and 10 run 20 sleeping operations
/// 2. Verify the observed peak never exceeds the ceiling
#[tokio::test(flavor = "multi_thread")]
async fn test_ceiling_holds_for_each_limit() {
    for limit in [1usize, 2, 3, 5, 10] {
        let probe = ConcurrencyProbe::new();
        let result = executor(limit, false)
            .execute((0..20).collect::<Vec<u32>>(), |n| {
                let probe = probe.clone();
                async move {
                    let _guard = probe.enter();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(n)
                }
            })
            .await
            .expect("continue mode returns Ok");

        assert!(probe.peak() <= limit, "limit {limit}: peak {}", probe.peak());
        assert!(probe.peak() > 0);
        assert_eq!(result.success_count(), 20);
    }
}

/// Validates continue-on-error bookkeeping for a small batch.
///
/// # Test Steps
/// 1. Multiply items 0 through 5 by ten, failing on 2 and 4
/// 2. Verify the error indices and the surviving outputs in order
#[tokio::test]
async fn test_failures_are_indexed_and_successes_kept() {
    let result = executor(3, false)
        .execute((0..=5).collect::<Vec<u32>>(), |n| async move {
            if n == 2 || n == 4 {
                Err(ApiError::validation(format!("item {n} rejected")))
            } else {
                Ok(n * 10)
            }
        })
        .await
        .expect("continue mode returns Ok");

    let indices: Vec<usize> = result.errors.iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, vec![2, 4]);
    let outputs: Vec<u32> = result.successful_results().into_iter().copied().collect();
    assert_eq!(outputs, vec![0, 10, 30, 50]);
}

/// Validates that parallel execution beats sequential execution.
///
/// # Test Steps
/// 1. Run 15 operations of 30ms each with a ceiling of 1
/// 2. Run the same operations with a ceiling of 10
/// 3. Verify the parallel run is at least twice as fast
#[tokio::test(flavor = "multi_thread")]
async fn test_parallel_batch_is_faster_than_sequential() {
    async fn timed_run(limit: usize) -> Duration {
        let started = Instant::now();
        let result = executor(limit, false)
            .execute((0..15).collect::<Vec<u32>>(), |n| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(n)
            })
            .await
            .expect("continue mode returns Ok");
        assert_eq!(result.success_count(), 15);
        started.elapsed()
    }

    let sequential = timed_run(1).await;
    let parallel = timed_run(10).await;

    assert!(
        parallel * 2 <= sequential,
        "parallel {parallel:?} should be at least 2x faster than sequential {sequential:?}"
    );
}
