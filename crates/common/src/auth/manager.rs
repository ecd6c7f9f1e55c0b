use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::credential_cache::CredentialCache;
use super::types::{CredentialCacheConfig, CredentialCacheMetrics};
use crate::error::ConfigError;
use crate::observability::MetricsCollector;
use crate::resilience::{Clock, SystemClock};

/// Keyed registry of credential caches
///
/// Each key gets exactly one cache, created on first use. Keys are opaque
/// (a user, a workspace, an API profile).
pub struct CredentialCacheManager {
    config: CredentialCacheConfig,
    clock: Arc<dyn Clock>,
    metrics_sink: Option<Arc<MetricsCollector>>,
    caches: Mutex<HashMap<String, Arc<CredentialCache>>>,
}

impl std::fmt::Debug for CredentialCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCacheManager")
            .field("config", &self.config)
            .field("caches", &self.caches.lock().len())
            .finish_non_exhaustive()
    }
}

impl CredentialCacheManager {
    pub fn new(config: CredentialCacheConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: CredentialCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, clock, metrics_sink: None, caches: Mutex::new(HashMap::new()) })
    }

    /// Caches created from now on forward hits and misses to `sink`
    pub fn with_metrics_sink(mut self, sink: Arc<MetricsCollector>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }

    /// The cache for `key`, created on first request
    pub fn get_cache(&self, key: &str) -> Arc<CredentialCache> {
        let mut caches = self.caches.lock();
        let cache = caches.entry(key.to_string()).or_insert_with(|| {
            debug!(key, "Creating credential cache");
            Arc::new(CredentialCache::from_validated(
                self.config.clone(),
                Arc::clone(&self.clock),
                self.metrics_sink.clone(),
            ))
        });
        Arc::clone(cache)
    }

    /// Invalidate the credential for `key`
    ///
    /// Returns false when `key` is unknown or holds no token, so a repeated
    /// call reports nothing removed.
    pub fn invalidate(&self, key: &str) -> bool {
        let cache = self.caches.lock().get(key).cloned();
        cache.is_some_and(|cache| cache.invalidate())
    }

    pub fn invalidate_all(&self) {
        let caches: Vec<_> = self.caches.lock().values().cloned().collect();
        for cache in caches {
            cache.invalidate();
        }
    }

    pub fn get_all_metrics(&self) -> HashMap<String, CredentialCacheMetrics> {
        let caches: Vec<_> =
            self.caches.lock().iter().map(|(key, cache)| (key.clone(), Arc::clone(cache))).collect();
        caches.into_iter().map(|(key, cache)| (key, cache.metrics())).collect()
    }

    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }
}
