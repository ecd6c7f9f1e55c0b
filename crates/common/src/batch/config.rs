use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for [`BatchExecutor`](super::BatchExecutor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum operations in flight at once
    pub max_concurrency: usize,
    /// Items per chunk for chunked execution
    pub chunk_size: usize,
    /// Abort the whole batch on the first failure
    pub fail_fast: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 10, chunk_size: 50, fail_fast: false }
    }
}

impl BatchConfig {
    /// Create a new configuration builder
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("max_concurrency", "must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::invalid("chunk_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for BatchConfig
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn new() -> Self {
        Self { config: BatchConfig::default() }
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    pub fn build(self) -> Result<BatchConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
