//! Token bucket rate limiting for outbound API calls
//!
//! [`TokenBucket`] holds a fractional token count that refills lazily on
//! every observation, so no background task is needed. [`RateLimiter`]
//! wraps one bucket with an admission policy (wait up to a timeout, or
//! refuse immediately) and counts what happened to every request.
//!
//! Waiters are not queued: whichever task observes enough tokens first
//! wins, so there is no FIFO fairness under contention.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use crate::error::{ApiError, ApiResult, ConfigError};
use crate::utils::serde::duration_millis;

/// Longest single sleep while waiting for tokens
pub const MAX_WAIT_SLICE: Duration = Duration::from_millis(100);

/// Shortest sleep while waiting for tokens
const MIN_WAIT_SLICE: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with continuous refill
///
/// Refill and deduction happen under one mutex, so two concurrent acquirers
/// can never both spend the same tokens.
///
/// # Examples
///
/// ```rust
/// use taiga_mcp_common::resilience::TokenBucket;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bucket = TokenBucket::new(10.0, 5.0)?;
///
/// if bucket.try_acquire(3.0) {
///     println!("Request allowed");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TokenBucket<C: Clock = SystemClock> {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
    clock: C,
}

impl TokenBucket<SystemClock> {
    /// Create a full bucket using the system clock
    pub fn new(capacity: f64, refill_rate: f64) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, refill_rate, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a full bucket with a custom clock
    pub fn with_clock(capacity: f64, refill_rate: f64, clock: C) -> Result<Self, ConfigError> {
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(ConfigError::invalid("capacity", "must be a positive number"));
        }
        if !(refill_rate.is_finite() && refill_rate > 0.0) {
            return Err(ConfigError::invalid("refill_rate", "must be a positive number"));
        }

        let state = BucketState { tokens: capacity, last_refill: clock.now() };
        Ok(Self { capacity, refill_rate, state: Mutex::new(state), clock })
    }

    /// Maximum number of tokens the bucket holds
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
            state.last_refill = now;
        }
    }

    /// Try to take `cost` tokens without waiting
    ///
    /// Returns `false` (leaving the bucket untouched) when fewer than `cost`
    /// tokens are available after refill.
    pub fn try_acquire(&self, cost: f64) -> bool {
        if !(cost >= 0.0) {
            debug!(cost, "Rejecting invalid token cost");
            return false;
        }

        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens >= cost {
            state.tokens -= cost;
            debug!(cost, remaining = state.tokens, "Acquired tokens");
            true
        } else {
            debug!(cost, available = state.tokens, "Rate limit: insufficient tokens");
            false
        }
    }

    /// Wait until `cost` tokens are acquired or `timeout` elapses
    ///
    /// Sleeps at most [`MAX_WAIT_SLICE`] between attempts. A cost larger
    /// than the capacity can never be satisfied and fails immediately.
    pub async fn wait_for_token(&self, cost: f64, timeout: Duration) -> bool {
        if cost > self.capacity {
            warn!(cost, capacity = self.capacity, "Token cost exceeds bucket capacity");
            return false;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.try_acquire(cost) {
                return true;
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                debug!(cost, ?timeout, "Timed out waiting for tokens");
                return false;
            }

            let slice = self.time_until_available(cost).min(deadline - now);
            tokio::time::sleep(slice).await;
        }
    }

    fn time_until_available(&self, cost: f64) -> Duration {
        let mut state = self.state.lock();
        self.refill(&mut state);
        let deficit = (cost - state.tokens).max(0.0);
        Duration::try_from_secs_f64(deficit / self.refill_rate)
            .unwrap_or(MAX_WAIT_SLICE)
            .clamp(MIN_WAIT_SLICE, MAX_WAIT_SLICE)
    }

    /// Tokens currently available, after refill
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Refill the bucket to capacity
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tokens = self.capacity;
        state.last_refill = self.clock.now();
    }
}

/// Configuration for [`RateLimiter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Sustained request rate (bucket refill rate)
    pub max_requests_per_second: f64,
    /// Bucket capacity; `None` means twice the request rate
    pub burst_size: Option<f64>,
    /// Longest time a request waits for a token
    #[serde(with = "duration_millis", rename = "wait_timeout_ms")]
    pub wait_timeout: Duration,
    /// Whether refused requests wait for tokens or fail immediately
    pub wait_enabled: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: 10.0,
            burst_size: None,
            wait_timeout: Duration::from_secs(30),
            wait_enabled: true,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Bucket capacity after applying the burst default
    pub fn effective_burst_size(&self) -> f64 {
        self.burst_size.unwrap_or(self.max_requests_per_second * 2.0)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_requests_per_second.is_finite() && self.max_requests_per_second > 0.0) {
            return Err(ConfigError::invalid(
                "max_requests_per_second",
                "must be a positive number",
            ));
        }
        if let Some(burst) = self.burst_size {
            if !(burst.is_finite() && burst >= 1.0) {
                return Err(ConfigError::invalid("burst_size", "must be at least 1"));
            }
        }
        Ok(())
    }
}

/// Builder for RateLimiterConfig
#[derive(Debug, Default)]
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterConfigBuilder {
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default() }
    }

    pub fn max_requests_per_second(mut self, rate: f64) -> Self {
        self.config.max_requests_per_second = rate;
        self
    }

    pub fn burst_size(mut self, burst: f64) -> Self {
        self.config.burst_size = Some(burst);
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    pub fn wait_enabled(mut self, enabled: bool) -> Self {
        self.config.wait_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<RateLimiterConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time view of the limiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    /// Every admission attempt
    pub total_requests: u64,
    /// Attempts that were ultimately refused
    pub limited_requests: u64,
    /// Attempts that had to wait for tokens (admitted or not)
    pub waited_requests: u64,
}

/// Request admission in front of the Taiga API
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    bucket: TokenBucket<C>,
    config: RateLimiterConfig,
    total_requests: AtomicU64,
    limited_requests: AtomicU64,
    waited_requests: AtomicU64,
}

impl RateLimiter<SystemClock> {
    /// Create a limiter using the system clock
    pub fn new(config: RateLimiterConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter with a custom clock
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let bucket = TokenBucket::with_clock(
            config.effective_burst_size(),
            config.max_requests_per_second,
            clock,
        )?;

        Ok(Self {
            bucket,
            config,
            total_requests: AtomicU64::new(0),
            limited_requests: AtomicU64::new(0),
            waited_requests: AtomicU64::new(0),
        })
    }

    /// The limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// The underlying bucket
    pub fn bucket(&self) -> &TokenBucket<C> {
        &self.bucket
    }

    /// Admit a request of the given cost, waiting if the policy allows
    pub async fn acquire(&self, cost: f64) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if self.bucket.try_acquire(cost) {
            return true;
        }

        if !self.config.wait_enabled {
            self.limited_requests.fetch_add(1, Ordering::Relaxed);
            debug!(cost, "Request refused without waiting");
            return false;
        }

        self.waited_requests.fetch_add(1, Ordering::Relaxed);
        debug!(cost, timeout = ?self.config.wait_timeout, "Waiting for rate limit tokens");

        if self.bucket.wait_for_token(cost, self.config.wait_timeout).await {
            true
        } else {
            self.limited_requests.fetch_add(1, Ordering::Relaxed);
            warn!(
                cost,
                timeout_ms = self.config.wait_timeout.as_millis() as u64,
                "Rate limit wait timed out"
            );
            false
        }
    }

    /// Like [`acquire`](Self::acquire), but refusal is an [`ApiError::RateLimited`]
    pub async fn admit(&self, cost: f64) -> ApiResult<()> {
        if self.acquire(cost).await {
            Ok(())
        } else {
            Err(ApiError::rate_limited(format!(
                "local limit of {} requests/s exhausted",
                self.config.max_requests_per_second
            )))
        }
    }

    /// Admit one request, then run `operation`
    pub async fn run<F, Fut, T>(&self, operation: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.admit(1.0).await?;
        operation().await
    }

    /// Current counter values
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            limited_requests: self.limited_requests.load(Ordering::Relaxed),
            waited_requests: self.waited_requests.load(Ordering::Relaxed),
        }
    }
}
