//! Composition root for outbound Taiga calls
//!
//! Every call goes through the same stages:
//!
//! ```text
//! credentials ──► retry loop ──► rate limiter ──► transport ──► metrics
//! ```
//!
//! Credentials are resolved once per call (refreshing when needed). Each
//! attempt inside the retry loop is admitted by the rate limiter separately,
//! so retries spend tokens like first attempts do.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use taiga_mcp_common::auth::{
    CredentialCacheManager, CredentialCacheMetrics, TokenGrant, TokenRefresher,
};
use taiga_mcp_common::batch::{BatchExecutor, BatchResult};
use taiga_mcp_common::config::ResilienceConfig;
use taiga_mcp_common::error::{ApiError, ApiResult, ConfigError};
use taiga_mcp_common::observability::{MetricsCollector, MetricsSnapshot};
use taiga_mcp_common::resilience::{RateLimiter, RateLimiterStats, RetryExecutor, RetryPolicy};
use tracing::{debug, info, instrument};

use crate::auth::TaigaTokenRefresher;
use crate::http::{ApiRequest, ApiTransport, TaigaHttpClient};

/// Resilient entry point for Taiga API calls, keyed by credential owner
pub struct ApiGateway {
    transport: Arc<dyn ApiTransport>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    rate_limiter: RateLimiter,
    retry: RetryExecutor,
    credentials: CredentialCacheManager,
    batch: BatchExecutor,
    metrics: Arc<MetricsCollector>,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("has_refresher", &self.refresher.is_some())
            .field("rate_limit", self.rate_limiter.config())
            .field("retry", self.retry.policy().config())
            .field("batch", self.batch.config())
            .field("credential_keys", &self.credentials.len())
            .finish()
    }
}

impl ApiGateway {
    pub fn builder() -> ApiGatewayBuilder {
        ApiGatewayBuilder::new()
    }

    /// Perform one request on behalf of `key`
    ///
    /// Fails with an authentication error when `key` has no usable token.
    #[instrument(skip(self, request), fields(operation = %request.operation_name()))]
    pub async fn call(&self, key: &str, request: &ApiRequest) -> ApiResult<Value> {
        let token = self
            .credentials
            .get_cache(key)
            .get_valid_token(self.refresher.as_deref())
            .await?
            .ok_or_else(|| ApiError::authentication(format!("no valid credentials for '{key}'")))?;

        let operation = request.operation_name();
        self.retry.execute(&operation, || self.attempt(request, &token)).await
    }

    async fn attempt(&self, request: &ApiRequest, token: &str) -> ApiResult<Value> {
        self.rate_limiter.admit(1.0).await?;

        let started = Instant::now();
        let result = self.transport.send(request, Some(token)).await;
        self.metrics.record_request(
            &request.path,
            request.method.as_str(),
            started.elapsed(),
            result.is_ok(),
        );
        if let Err(err) = &result {
            self.metrics.record_error(err.kind().as_str());
        }
        result
    }

    /// Perform several requests for `key` with bounded concurrency
    ///
    /// Results keep the order of `requests`. In fail-fast mode the first
    /// failure is returned instead.
    pub async fn call_many(
        &self,
        key: &str,
        requests: Vec<ApiRequest>,
    ) -> ApiResult<BatchResult<Value>> {
        self.batch
            .execute(requests, |request| async move { self.call(key, &request).await })
            .await
    }

    /// Store credentials for `key`, replacing any previous ones
    pub fn login(&self, key: &str, grant: TokenGrant) {
        info!(key, "storing credentials");
        self.credentials.get_cache(key).set_token(grant);
    }

    /// Forget the credentials for `key`; false if none were cached
    pub fn logout(&self, key: &str) -> bool {
        let removed = self.credentials.invalidate(key);
        debug!(key, removed, "credentials invalidated");
        removed
    }

    /// Collector every attempt is recorded into
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot()
    }

    pub fn credential_metrics(&self) -> HashMap<String, CredentialCacheMetrics> {
        self.credentials.get_all_metrics()
    }

    pub fn rate_limiter_stats(&self) -> RateLimiterStats {
        self.rate_limiter.stats()
    }

    /// Consecutive terminal failures per operation name
    pub fn retry_failures(&self) -> HashMap<String, u64> {
        self.retry.failure_counts()
    }
}

/// Builder for [`ApiGateway`].
///
/// Either a base URL or a transport is required. With a base URL the
/// gateway talks to Taiga over HTTP and refreshes tokens through Taiga's
/// refresh endpoint unless another refresher is supplied.
#[derive(Default)]
pub struct ApiGatewayBuilder {
    config: ResilienceConfig,
    base_url: Option<String>,
    transport: Option<Arc<dyn ApiTransport>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ApiGatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ResilienceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn ApiTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Collector to record into, e.g. the process-wide `metrics_collector()`
    ///
    /// An injected collector keeps its own configuration and the `metrics`
    /// section of [`ResilienceConfig`] is ignored. When unset, a dedicated
    /// collector is built from that section.
    pub fn metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<ApiGateway, ConfigError> {
        self.config.validate()?;

        let (transport, refresher) = match (self.transport, self.base_url) {
            (Some(transport), _) => (transport, self.refresher),
            (None, Some(base_url)) => {
                let client = TaigaHttpClient::new(base_url)?;
                let refresher = self.refresher.unwrap_or_else(|| {
                    Arc::new(TaigaTokenRefresher::new(client.clone())) as Arc<dyn TokenRefresher>
                });
                (Arc::new(client) as Arc<dyn ApiTransport>, Some(refresher))
            }
            (None, None) => {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    message: "either a base URL or a transport is required".to_string(),
                })
            }
        };

        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(MetricsCollector::with_config(self.config.metrics)?),
        };
        let credentials = CredentialCacheManager::new(self.config.credentials)?
            .with_metrics_sink(Arc::clone(&metrics));

        Ok(ApiGateway {
            transport,
            refresher,
            rate_limiter: RateLimiter::new(self.config.rate_limit)?,
            retry: RetryExecutor::new(RetryPolicy::new(self.config.retry)?),
            credentials,
            batch: BatchExecutor::new(self.config.batch)?,
            metrics,
        })
    }
}
