//! Retrying error-handling stage for outbound calls
//!
//! [`RetryPolicy`] is a pure decision function over [`ApiError`]: given a
//! failure and the number of the attempt that produced it, it says whether
//! to retry and after how long. [`RetryExecutor`] drives the attempt loop
//! and keeps a per-operation count of terminal failures.
//!
//! | Failure kind | Decision | Delay before retry `n` |
//! |--------------|----------|------------------------|
//! | Rate limited | retry | `base_delay * 2^(n-1)` |
//! | Transient remote | retry | `base_delay * n` |
//! | Everything else | stop | - |
//!
//! Delays are capped at `max_delay`; retries are bounded by count only.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::error::{ApiError, ApiResult, ConfigError, ErrorKind};
use crate::utils::serde::duration_millis;

/// Default maximum delay between retries
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Configuration for [`RetryPolicy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts is one more)
    pub max_retries: u32,
    /// Unit delay the backoff formulas scale
    #[serde(with = "duration_millis", rename = "base_delay_ms")]
    pub base_delay: Duration,
    /// Upper bound for any single delay
    #[serde(with = "duration_millis", rename = "max_delay_ms")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_secs(1), max_delay: DEFAULT_MAX_DELAY }
    }
}

impl RetryConfig {
    /// Create a new configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_delay < self.base_delay {
            return Err(ConfigError::invalid("max_delay", "must not be smaller than base_delay"));
        }
        Ok(())
    }
}

/// Builder for RetryConfig
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay
    Retry(Duration),
    /// Surface the error to the caller
    Stop,
}

/// Maps a failure to a retry decision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed
    pub fn decide(&self, error: &ApiError, attempt: u32) -> RetryDecision {
        if attempt == 0 || attempt > self.config.max_retries {
            return RetryDecision::Stop;
        }

        let delay = match error.kind() {
            ErrorKind::RateLimited => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.config.base_delay.saturating_mul(factor)
            }
            ErrorKind::TransientRemote => self.config.base_delay.saturating_mul(attempt),
            _ => return RetryDecision::Stop,
        };

        RetryDecision::Retry(delay.min(self.config.max_delay))
    }
}

/// Executes operations under a [`RetryPolicy`]
///
/// Terminal failures are counted per operation name; a success resets that
/// operation's count to zero.
#[derive(Debug, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    failure_counts: Mutex<HashMap<String, u64>>,
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, failure_counts: Mutex::new(HashMap::new()) }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retry logic
    #[instrument(skip(self, operation), fields(max_retries = self.policy.config.max_retries))]
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt: u32 = 1;

        loop {
            debug!(attempt, "Executing operation");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(retries = attempt - 1, "Operation succeeded after retries");
                    }
                    self.failure_counts.lock().insert(operation_name.to_string(), 0);
                    return Ok(value);
                }
                Err(err) => match self.policy.decide(&err, attempt) {
                    RetryDecision::Retry(delay) => {
                        warn!(
                            attempt,
                            error_type = err.kind().as_str(),
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Operation failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::Stop => {
                        self.record_terminal_failure(operation_name, attempt, &err);
                        return Err(err);
                    }
                },
            }
        }
    }

    fn record_terminal_failure(&self, operation_name: &str, attempt: u32, err: &ApiError) {
        let count = {
            let mut counts = self.failure_counts.lock();
            let entry = counts.entry(operation_name.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        if err.kind() == ErrorKind::Unknown {
            error!(
                attempt,
                consecutive_failures = count,
                error = ?err,
                fields = ?err.as_tracing_fields(),
                "Unexpected error in operation"
            );
        } else {
            warn!(
                attempt,
                consecutive_failures = count,
                error_type = err.kind().as_str(),
                error = %err,
                "Operation failed permanently"
            );
        }
    }

    /// Consecutive terminal failures of `operation_name`
    pub fn failure_count(&self, operation_name: &str) -> u64 {
        self.failure_counts.lock().get(operation_name).copied().unwrap_or(0)
    }

    /// Snapshot of every operation's failure count
    pub fn failure_counts(&self) -> HashMap<String, u64> {
        self.failure_counts.lock().clone()
    }
}
