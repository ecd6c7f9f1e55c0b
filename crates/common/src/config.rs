//! Aggregate configuration for the resilience layer
//!
//! Every section falls back to its defaults, so a partial document (or an
//! empty one) is valid. Durations are written in milliseconds.
//!
//! ```toml
//! [rate_limit]
//! max_requests_per_second = 5.0
//! wait_timeout_ms = 10000
//!
//! [retry]
//! max_retries = 5
//!
//! [batch]
//! max_concurrency = 4
//! fail_fast = true
//! ```

use serde::{Deserialize, Serialize};

use crate::auth::CredentialCacheConfig;
use crate::batch::BatchConfig;
use crate::error::ConfigError;
use crate::observability::MetricsConfig;
use crate::resilience::{RateLimiterConfig, RetryConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub rate_limit: RateLimiterConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub credentials: CredentialCacheConfig,
    pub metrics: MetricsConfig,
}

impl ResilienceConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_limit.validate()?;
        self.retry.validate()?;
        self.batch.validate()?;
        self.credentials.validate()?;
        self.metrics.validate()
    }
}
