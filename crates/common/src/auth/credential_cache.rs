//! Proactively refreshing bearer credential cache
//!
//! A cached token moves through Empty → Valid → ExpiringSoon → Expired as
//! time passes. Reads inside the refresh window trigger a refresh through a
//! caller-supplied [`TokenRefresher`]; a failed refresh falls back to the
//! old token for as long as it is still valid.
//!
//! `get_valid_token` holds an async gate for its whole duration, so at most
//! one refresh per cache is in flight and concurrent readers queue behind
//! it. Credential fields sit behind a separate synchronous lock so metrics
//! and validity checks never wait on the network.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::traits::TokenRefresher;
use super::types::{CredentialCacheConfig, CredentialCacheMetrics, CredentialState, TokenGrant};
use crate::error::{ApiResult, ConfigError};
use crate::observability::MetricsCollector;
use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Default)]
struct Credentials {
    token: Option<String>,
    refresh_token: Option<String>,
    principal_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    last_refresh: Option<DateTime<Utc>>,
}

fn to_time_delta(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    at.checked_add_signed(to_time_delta(duration)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Cache for one principal's bearer credential
pub struct CredentialCache {
    config: CredentialCacheConfig,
    clock: Arc<dyn Clock>,
    credentials: RwLock<Credentials>,
    refresh_gate: tokio::sync::Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    metrics_sink: Option<Arc<MetricsCollector>>,
}

impl fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCache")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .field("refreshes", &self.refreshes.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    pub fn new(config: CredentialCacheConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: CredentialCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config, clock, None))
    }

    pub(crate) fn from_validated(
        config: CredentialCacheConfig,
        clock: Arc<dyn Clock>,
        metrics_sink: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            config,
            clock,
            credentials: RwLock::new(Credentials::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            metrics_sink,
        }
    }

    /// Forward hits and misses to a shared collector as well
    pub fn with_metrics_sink(mut self, sink: Arc<MetricsCollector>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &CredentialCacheConfig {
        &self.config
    }

    /// Store a credential, replacing whatever was cached
    ///
    /// Expiry comes from the grant's absolute time, then its TTL, then the
    /// configured default TTL.
    pub fn set_token(&self, grant: TokenGrant) {
        let now = self.clock.utc_now();
        let expires_at = grant
            .expires_at
            .unwrap_or_else(|| add_duration(now, grant.ttl.unwrap_or(self.config.default_ttl)));

        let mut credentials = self.credentials.write();
        credentials.token = Some(grant.token);
        credentials.refresh_token = grant.refresh_token;
        credentials.principal_id = grant.principal_id;
        credentials.expires_at = Some(expires_at);

        info!(
            principal_id = credentials.principal_id.as_deref().unwrap_or("-"),
            %expires_at,
            "Credential stored"
        );
    }

    fn is_valid_at(credentials: &Credentials, now: DateTime<Utc>) -> bool {
        credentials.token.is_some() && credentials.expires_at.is_some_and(|at| now < at)
    }

    fn needs_refresh_at(&self, credentials: &Credentials, now: DateTime<Utc>) -> bool {
        match (&credentials.token, credentials.expires_at) {
            (Some(_), Some(at)) => add_duration(now, self.config.refresh_threshold) > at,
            _ => true,
        }
    }

    /// True when a token is cached and has not expired
    pub fn is_valid(&self) -> bool {
        Self::is_valid_at(&self.credentials.read(), self.clock.utc_now())
    }

    /// True when no token is cached or expiry is inside the refresh window
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(&self.credentials.read(), self.clock.utc_now())
    }

    pub fn state(&self) -> CredentialState {
        let credentials = self.credentials.read();
        let now = self.clock.utc_now();
        if credentials.token.is_none() {
            CredentialState::Empty
        } else if !Self::is_valid_at(&credentials, now) {
            CredentialState::Expired
        } else if self.needs_refresh_at(&credentials, now) {
            CredentialState::ExpiringSoon
        } else {
            CredentialState::Valid
        }
    }

    pub fn principal_id(&self) -> Option<String> {
        self.credentials.read().principal_id.clone()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.credentials.read().expires_at
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if let Some(sink) = &self.metrics_sink {
            sink.record_cache_hit();
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        if let Some(sink) = &self.metrics_sink {
            sink.record_cache_miss();
        }
    }

    /// Return a usable token, refreshing first when inside the refresh window
    ///
    /// Returns `Ok(None)` when nothing valid is cached and no refresh was
    /// possible. A failed refresh is swallowed while the old token is still
    /// valid and propagated otherwise.
    pub async fn get_valid_token(
        &self,
        refresher: Option<&dyn TokenRefresher>,
    ) -> ApiResult<Option<String>> {
        let _gate = self.refresh_gate.lock().await;

        let now = self.clock.utc_now();
        let (valid, needs_refresh, token, refresh_token) = {
            let credentials = self.credentials.read();
            (
                Self::is_valid_at(&credentials, now),
                self.needs_refresh_at(&credentials, now),
                credentials.token.clone(),
                credentials.refresh_token.clone(),
            )
        };

        if valid && !needs_refresh {
            self.record_hit();
            return Ok(token);
        }
        self.record_miss();

        let current = if valid { token } else { None };
        let (Some(refresher), Some(refresh_token)) = (refresher, refresh_token) else {
            debug!(valid, "Credential needs refresh but no refresher or refresh token");
            return Ok(current);
        };

        debug!(valid, "Refreshing credential");
        match refresher.refresh(&refresh_token).await {
            Ok(refreshed) => {
                let now = self.clock.utc_now();
                let mut credentials = self.credentials.write();
                credentials.token = Some(refreshed.auth_token.clone());
                if let Some(new_refresh) = refreshed.refresh_token {
                    credentials.refresh_token = Some(new_refresh);
                }
                if let Some(id) = refreshed.id {
                    credentials.principal_id = Some(id);
                }
                let expires_at = add_duration(now, self.config.default_ttl);
                credentials.expires_at = Some(expires_at);
                credentials.last_refresh = Some(now);
                self.refreshes.fetch_add(1, Ordering::Relaxed);

                info!(%expires_at, "Credential refreshed");
                Ok(Some(refreshed.auth_token))
            }
            Err(err) if current.is_some() => {
                warn!(error = %err, "Credential refresh failed, using current token");
                Ok(current)
            }
            Err(err) => {
                warn!(error = %err, "Credential refresh failed with no valid token");
                Err(err)
            }
        }
    }

    /// Drop every credential field; returns whether a token was cached
    pub fn invalidate(&self) -> bool {
        let previous = std::mem::take(&mut *self.credentials.write());
        let had_token = previous.token.is_some();
        info!(had_token, "Credential invalidated");
        had_token
    }

    pub fn metrics(&self) -> CredentialCacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let credentials = self.credentials.read();
        let now = self.clock.utc_now();

        CredentialCacheMetrics {
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            refreshes: self.refreshes.load(Ordering::Relaxed),
            last_refresh: credentials.last_refresh,
            token_valid: Self::is_valid_at(&credentials, now),
            needs_refresh: self.needs_refresh_at(&credentials, now),
            expires_at: credentials.expires_at,
        }
    }
}
