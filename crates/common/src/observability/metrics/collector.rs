//! Request, error and cache metrics aggregation
//!
//! One mutex guards every counter and the request log, so a snapshot is
//! always internally consistent (`successful + failed == total`).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::utils::serde::duration_millis;

/// Configuration for [`MetricsCollector`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Requests slower than this emit a slow-operation warning
    #[serde(with = "duration_millis", rename = "slow_request_threshold_ms")]
    pub slow_request_threshold: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { slow_request_threshold: Duration::from_secs(5) }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slow_request_threshold.is_zero() {
            return Err(ConfigError::invalid("slow_request_threshold", "must be greater than zero"));
        }
        Ok(())
    }
}

/// One recorded outbound request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    pub endpoint: String,
    pub method: String,
    pub duration_ms: f64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated view of everything recorded so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time_ms: f64,
    pub cache_hit_rate: f64,
    pub requests_by_endpoint: HashMap<String, u64>,
    pub errors_by_type: HashMap<String, u64>,
    pub timestamp: DateTime<Utc>,
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct MetricsState {
    requests: Vec<RequestRecord>,
    requests_by_endpoint: HashMap<String, u64>,
    errors_by_type: HashMap<String, u64>,
    cache_hits: u64,
    cache_misses: u64,
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Thread-safe metrics aggregator
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use taiga_mcp_common::observability::MetricsCollector;
///
/// let metrics = MetricsCollector::new();
/// metrics.record_request("/api/v1/projects", "GET", Duration::from_millis(120), true);
/// assert_eq!(metrics.get_snapshot().total_requests, 1);
/// ```
#[derive(Debug, Default)]
pub struct MetricsCollector {
    config: MetricsConfig,
    state: Mutex<MetricsState>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MetricsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, state: Mutex::new(MetricsState::default()) })
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one completed request
    pub fn record_request(&self, endpoint: &str, method: &str, duration: Duration, success: bool) {
        let duration_ms = duration.as_secs_f64() * 1000.0;
        {
            let mut state = self.lock_state();
            state.requests.push(RequestRecord {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                duration_ms,
                success,
                timestamp: Utc::now(),
            });
            *state.requests_by_endpoint.entry(endpoint.to_string()).or_insert(0) += 1;
        }

        if duration > self.config.slow_request_threshold {
            warn!(
                endpoint,
                method,
                duration_ms,
                threshold_ms = self.config.slow_request_threshold.as_millis() as u64,
                "Slow request"
            );
        } else {
            debug!(endpoint, method, duration_ms, success, "Request recorded");
        }
    }

    pub fn record_error(&self, error_type: &str) {
        let mut state = self.lock_state();
        *state.errors_by_type.entry(error_type.to_string()).or_insert(0) += 1;
    }

    pub fn record_cache_hit(&self) {
        self.lock_state().cache_hits += 1;
    }

    pub fn record_cache_miss(&self) {
        self.lock_state().cache_misses += 1;
    }

    /// Aggregate everything recorded so far
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.lock_state();

        let total = state.requests.len() as u64;
        let successful = state.requests.iter().filter(|r| r.success).count() as u64;
        let avg_response_time_ms = if state.requests.is_empty() {
            0.0
        } else {
            state.requests.iter().map(|r| r.duration_ms).sum::<f64>() / state.requests.len() as f64
        };

        MetricsSnapshot {
            total_requests: total,
            successful_requests: successful,
            failed_requests: total - successful,
            avg_response_time_ms,
            cache_hit_rate: hit_rate(state.cache_hits, state.cache_misses),
            requests_by_endpoint: state.requests_by_endpoint.clone(),
            errors_by_type: state.errors_by_type.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Clear every counter and the request log
    pub fn reset(&self) {
        *self.lock_state() = MetricsState::default();
    }

    pub fn get_request_count(&self) -> u64 {
        self.lock_state().requests.len() as u64
    }

    /// Errors of one type, or of all types when `error_type` is `None`
    pub fn get_error_count(&self, error_type: Option<&str>) -> u64 {
        let state = self.lock_state();
        match error_type {
            Some(kind) => state.errors_by_type.get(kind).copied().unwrap_or(0),
            None => state.errors_by_type.values().sum(),
        }
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let state = self.lock_state();
        CacheStats {
            hits: state.cache_hits,
            misses: state.cache_misses,
            hit_rate: hit_rate(state.cache_hits, state.cache_misses),
        }
    }

    /// Copy of the raw request log
    pub fn request_records(&self) -> Vec<RequestRecord> {
        self.lock_state().requests.clone()
    }
}
