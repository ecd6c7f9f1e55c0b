//! Integration tests for the resilience module
//!
//! Exercises the rate limiter and retry executor together under real
//! concurrency.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use taiga_mcp_common::error::{ApiError, ErrorKind};
use taiga_mcp_common::resilience::{
    MockClock, RateLimiter, RateLimiterConfig, RetryConfig, RetryExecutor, RetryPolicy,
    TokenBucket,
};
use taiga_mcp_common::testing::FlakyOperation;

fn fast_retry() -> RetryExecutor {
    let config = RetryConfig::builder()
        .max_retries(3)
        .base_delay(Duration::from_millis(5))
        .build()
        .expect("valid retry config");
    RetryExecutor::new(RetryPolicy::new(config).expect("valid retry policy"))
}

/// Validates that concurrent acquirers never overspend the bucket.
///
/// # Test Steps
/// 1. Create a bucket of 50 tokens on a frozen mock clock
/// 2. Race 16 threads acquiring single tokens 10 times each
/// 3. Verify exactly 50 acquisitions succeed and the bucket is empty
#[test]
fn test_bucket_never_overspends_under_contention() {
    let bucket = Arc::new(
        TokenBucket::with_clock(50.0, 1.0, MockClock::new()).expect("valid bucket"),
    );
    let admitted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let bucket = Arc::clone(&bucket);
            let admitted = Arc::clone(&admitted);
            std::thread::spawn(move || {
                for _ in 0..10 {
                    if bucket.try_acquire(1.0) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 50);
    assert_eq!(bucket.available(), 0.0);
}

/// Validates that waiting requests are paced by the refill rate.
///
/// # Test Steps
/// 1. Configure 20 req/s with a burst of 2
/// 2. Acquire 6 tokens from concurrent tasks
/// 3. Verify all are admitted and the last needed roughly 200ms of refill
#[tokio::test(flavor = "multi_thread")]
async fn test_waiting_requests_are_paced() {
    let config = RateLimiterConfig::builder()
        .max_requests_per_second(20.0)
        .burst_size(2.0)
        .wait_timeout(Duration::from_secs(5))
        .build()
        .expect("valid limiter config");
    let limiter = Arc::new(RateLimiter::new(config).expect("valid limiter"));
    let start = Instant::now();

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire(1.0).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.expect("task panicked"));
    }

    assert!(start.elapsed() >= Duration::from_millis(150));
    let stats = limiter.stats();
    assert_eq!(stats.total_requests, 6);
    assert_eq!(stats.limited_requests, 0);
    assert!(stats.waited_requests >= 4);
}

/// Validates the intended composition: admission inside the retry loop.
///
/// # Test Steps
/// 1. Wrap a flaky operation (2 transient failures) in limiter admission
/// 2. Run it through the retry executor
/// 3. Verify success on the third attempt and one token spent per attempt
#[tokio::test(flavor = "multi_thread")]
async fn test_retry_around_rate_limited_call() {
    let config = RateLimiterConfig::builder()
        .max_requests_per_second(1.0)
        .burst_size(10.0)
        .wait_enabled(false)
        .build()
        .expect("valid limiter config");
    let limiter = RateLimiter::with_clock(config, MockClock::new()).expect("valid limiter");
    let flaky = FlakyOperation::new(2, ApiError::remote("upstream 503"));
    let executor = fast_retry();

    let result = executor
        .execute("list_user_stories", || limiter.run(|| flaky.call()))
        .await;

    assert_eq!(result, Ok(3));
    assert_eq!(limiter.stats().total_requests, 3);
    assert!((limiter.bucket().available() - 7.0).abs() < 1e-9);
}

/// Validates that a local rate-limit refusal is retried with backoff.
///
/// # Test Steps
/// 1. Configure a no-wait limiter with a single token and a fast refill
/// 2. Run two calls back to back through the retry executor
/// 3. Verify the second call is refused at first and then admitted
#[tokio::test(flavor = "multi_thread")]
async fn test_local_rate_limit_refusal_is_retried() {
    let config = RateLimiterConfig::builder()
        .max_requests_per_second(100.0)
        .burst_size(1.0)
        .wait_enabled(false)
        .build()
        .expect("valid limiter config");
    let limiter = RateLimiter::new(config).expect("valid limiter");
    let executor = fast_retry();

    for _ in 0..2 {
        let result = executor
            .execute("get_project", || limiter.run(|| async { Ok::<_, ApiError>("project") }))
            .await;
        assert_eq!(result, Ok("project"));
    }

    assert!(limiter.stats().limited_requests >= 1);
    assert_eq!(executor.failure_count("get_project"), 0);
}

/// Validates that permanent failures are surfaced once and counted.
///
/// # Test Steps
/// 1. Run an operation that always fails with a permission error
/// 2. Verify a single attempt, the error kind, and the failure counter
#[tokio::test(flavor = "multi_thread")]
async fn test_permanent_failure_not_retried() {
    let executor = fast_retry();
    let flaky = FlakyOperation::new(u32::MAX, ApiError::permission_denied("not a member"));

    let err = executor.execute("delete_epic", || flaky.call()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(flaky.calls(), 1);
    assert_eq!(executor.failure_count("delete_epic"), 1);
}

/// Validates burst exhaustion and refill timing on a controlled clock.
///
/// # Test Steps
/// 1. Create a bucket with capacity 10 refilling 5 tokens per second
/// 2. Acquire 10 tokens immediately and attempt an 11th
/// 3. Advance the clock by one second and acquire again
#[test]
fn test_burst_then_refill_after_one_second() {
    let clock = MockClock::new();
    let bucket = TokenBucket::with_clock(10.0, 5.0, clock.clone()).expect("valid bucket");

    for i in 0..10 {
        assert!(bucket.try_acquire(1.0), "acquire {i} should succeed");
    }
    assert!(!bucket.try_acquire(1.0), "11th acquire should fail");

    clock.advance(Duration::from_secs(1));
    assert!(bucket.try_acquire(1.0));
    assert!((bucket.available() - 4.0).abs() < 1e-9);
}
