//! Credential data types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::utils::serde::duration_millis;

/// Configuration for [`CredentialCache`](super::CredentialCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialCacheConfig {
    /// Refresh proactively once expiry is closer than this
    #[serde(with = "duration_millis", rename = "refresh_threshold_ms")]
    pub refresh_threshold: Duration,
    /// Lifetime assumed for tokens that arrive without an expiry
    #[serde(with = "duration_millis", rename = "default_ttl_ms")]
    pub default_ttl: Duration,
}

impl Default for CredentialCacheConfig {
    fn default() -> Self {
        Self {
            refresh_threshold: Duration::from_secs(300),
            default_ttl: Duration::from_secs(86_400),
        }
    }
}

impl CredentialCacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl.is_zero() {
            return Err(ConfigError::invalid("default_ttl", "must be greater than zero"));
        }
        Ok(())
    }
}

/// A token handed to the cache by a login or by the caller
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use taiga_mcp_common::auth::TokenGrant;
///
/// let grant = TokenGrant::new("eyJhbGciOi...")
///     .with_refresh_token("eyJyZWZyZXNo...")
///     .with_principal_id("42")
///     .with_ttl(Duration::from_secs(3600));
/// assert_eq!(grant.principal_id.as_deref(), Some("42"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub refresh_token: Option<String>,
    pub principal_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub ttl: Option<Duration>,
}

impl TokenGrant {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), refresh_token: None, principal_id: None, expires_at: None, ttl: None }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_principal_id(mut self, principal_id: impl Into<String>) -> Self {
        self.principal_id = Some(principal_id.into());
        self
    }

    /// Absolute expiry; takes precedence over a TTL
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("principal_id", &self.principal_id)
            .field("expires_at", &self.expires_at)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Result of a successful refresh, in Taiga's field names
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedCredential {
    pub auth_token: String,
    #[serde(default, alias = "refresh")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
}

impl RefreshedCredential {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self { auth_token: auth_token.into(), refresh_token: None, id: None }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl std::fmt::Debug for RefreshedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedCredential")
            .field("auth_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("id", &self.id)
            .finish()
    }
}

// Taiga sends user ids as numbers; other principals may use strings.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(id)) => Some(id),
        Some(other) => Some(other.to_string()),
    })
}

/// Lifecycle state of a cached credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    /// No token cached
    Empty,
    /// Token valid and outside the refresh window
    Valid,
    /// Token valid but inside the refresh window
    ExpiringSoon,
    /// Token past its expiry
    Expired,
}

/// Counters and status of one credential cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialCacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub refreshes: u64,
    pub last_refresh: Option<DateTime<Utc>>,
    pub token_valid: bool,
    pub needs_refresh: bool,
    pub expires_at: Option<DateTime<Utc>>,
}
