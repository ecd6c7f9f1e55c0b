//! Error taxonomy shared by every component of the resilience layer
//!
//! Outbound calls to the Taiga API fail in a small, closed set of ways. The
//! HTTP boundary (see `taiga-mcp-infra`) maps status codes and transport
//! errors onto [`ApiError`] directly; only errors that arrive without that
//! information fall back to the message heuristic in
//! [`ApiError::from_opaque`] and [`is_transient_message`].
//!
//! | Kind | Retried | Variant |
//! |------|---------|---------|
//! | `RateLimited` | yes, exponential | [`ApiError::RateLimited`] |
//! | `TransientRemote` | yes, linear | [`ApiError::Transient`], or [`ApiError::Remote`] whose message looks transient |
//! | `PermanentRemote` | no | [`ApiError::Remote`] |
//! | `Authentication` | no | [`ApiError::Authentication`] |
//! | `PermissionDenied` | no | [`ApiError::PermissionDenied`] |
//! | `NotFound` | no | [`ApiError::NotFound`] |
//! | `Validation` | no | [`ApiError::Validation`] |
//! | `Refresh` | no (swallowed by the credential cache while a valid token remains) | [`ApiError::Refresh`] |
//! | `Unknown` | no, logged in full | [`ApiError::Unknown`] |
//!
//! The [`ErrorClassification`] trait gives monitoring code a uniform view
//! (retryability, severity, criticality, suggested delay) over these errors.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Result type used across the resilience layer
pub type ApiResult<T> = Result<T, ApiError>;

/// Message fragments that mark an opaque remote failure as transient.
pub const TRANSIENT_MARKERS: [&str; 6] = ["timeout", "connection", "network", "502", "503", "504"];

/// Failure of one outbound call (or of the layer guarding it)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The remote service or the local rate limiter refused the call
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String, retry_after: Option<Duration> },

    /// The remote service failed in a way that is expected to clear up
    #[error("Transient remote failure: {message}")]
    Transient { message: String },

    /// The remote service failed; transience is decided from the message
    #[error("{}", remote_display(*.status, .message))]
    Remote { status: Option<u16>, message: String },

    /// Credentials were rejected or are missing
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Credentials are valid but lack the required permission
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// The addressed resource does not exist
    #[error("{}", not_found_display(.resource, .identifier.as_deref()))]
    NotFound { resource: String, identifier: Option<String> },

    /// The request was rejected as malformed
    #[error("{}", validation_display(.field.as_deref(), .message))]
    Validation { field: Option<String>, message: String },

    /// Refreshing the bearer credential failed
    #[error("Credential refresh failed: {message}")]
    Refresh { message: String },

    /// Anything the layer does not know how to classify
    #[error("Unexpected error: {message}")]
    Unknown { message: String },
}

fn remote_display(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Remote service error ({status}): {message}"),
        None => format!("Remote service error: {message}"),
    }
}

fn not_found_display(resource: &str, identifier: Option<&str>) -> String {
    match identifier {
        Some(id) => format!("{resource} not found: '{id}'"),
        None => format!("{resource} not found"),
    }
}

fn validation_display(field: Option<&str>, message: &str) -> String {
    match field {
        Some(field) => format!("Validation error for field '{field}': {message}"),
        None => format!("Validation error: {message}"),
    }
}

/// Closed set of failure kinds the retry policy reasons about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    TransientRemote,
    PermanentRemote,
    Authentication,
    PermissionDenied,
    NotFound,
    Validation,
    Refresh,
    Unknown,
}

impl ErrorKind {
    /// Stable identifier used as the metrics `error_type` label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::TransientRemote => "transient_remote",
            Self::PermanentRemote => "permanent_remote",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Refresh => "refresh",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when an opaque failure message looks like a transient fault.
///
/// Matching is case-insensitive against [`TRANSIENT_MARKERS`].
pub fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| lowered.contains(marker))
}

impl ApiError {
    /// Create a rate limit error
    pub fn rate_limited<S: Into<String>>(message: S) -> Self {
        Self::RateLimited { message: message.into(), retry_after: None }
    }

    /// Create a rate limit error carrying the server's suggested delay
    pub fn rate_limited_with_retry<S: Into<String>>(message: S, retry_after: Duration) -> Self {
        Self::RateLimited { message: message.into(), retry_after: Some(retry_after) }
    }

    /// Create a transient remote failure
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient { message: message.into() }
    }

    /// Create a remote failure whose transience is decided by its message
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::Remote { status: None, message: message.into() }
    }

    /// Create a remote failure with the HTTP status that produced it
    pub fn remote_status<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Remote { status: Some(status), message: message.into() }
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication { message: message.into() }
    }

    /// Create a permission error
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>>(resource: R) -> Self {
        Self::NotFound { resource: resource.into(), identifier: None }
    }

    /// Create a not found error with identifier
    pub fn not_found_with_id<R: Into<String>, I: Into<String>>(resource: R, identifier: I) -> Self {
        Self::NotFound { resource: resource.into(), identifier: Some(identifier.into()) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { field: None, message: message.into() }
    }

    /// Create a validation error for a specific field
    pub fn validation_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Validation { field: Some(field.into()), message: message.into() }
    }

    /// Create a refresh error
    pub fn refresh<S: Into<String>>(message: S) -> Self {
        Self::Refresh { message: message.into() }
    }

    /// Create an unknown error
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown { message: message.into() }
    }

    /// Classify a foreign error that carries no status information.
    ///
    /// Only the message is available, so transient-looking messages become
    /// [`ApiError::Transient`] and everything else [`ApiError::Unknown`].
    pub fn from_opaque(error: &(dyn std::error::Error + 'static)) -> Self {
        let message = error.to_string();
        if is_transient_message(&message) {
            Self::Transient { message }
        } else {
            Self::Unknown { message }
        }
    }

    /// The failure kind this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Transient { .. } => ErrorKind::TransientRemote,
            Self::Remote { status: Some(502..=504), .. } => ErrorKind::TransientRemote,
            Self::Remote { message, .. } => {
                if is_transient_message(message) {
                    ErrorKind::TransientRemote
                } else {
                    ErrorKind::PermanentRemote
                }
            }
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Refresh { .. } => ErrorKind::Refresh,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The human-readable message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Self::RateLimited { message, .. }
            | Self::Transient { message }
            | Self::Remote { message, .. }
            | Self::Authentication { message }
            | Self::PermissionDenied { message }
            | Self::Validation { message, .. }
            | Self::Refresh { message }
            | Self::Unknown { message } => message,
            Self::NotFound { resource, .. } => resource,
        }
    }

    /// Convert error to structured logging fields
    pub fn as_tracing_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("error_type", self.kind().as_str().to_string())];
        match self {
            Self::RateLimited { message, retry_after } => {
                fields.push(("message", message.clone()));
                if let Some(retry) = retry_after {
                    fields.push(("retry_after_ms", retry.as_millis().to_string()));
                }
            }
            Self::Remote { status, message } => {
                if let Some(status) = status {
                    fields.push(("status", status.to_string()));
                }
                fields.push(("message", message.clone()));
            }
            Self::NotFound { resource, identifier } => {
                fields.push(("resource", resource.clone()));
                if let Some(id) = identifier {
                    fields.push(("identifier", id.clone()));
                }
            }
            Self::Validation { field, message } => {
                if let Some(field) = field {
                    fields.push(("field", field.clone()));
                }
                fields.push(("message", message.clone()));
            }
            other => fields.push(("message", other.message().to_string())),
        }
        fields
    }
}

/// Error classification trait for consistent error handling across modules
///
/// Monitoring and higher-level retry code use this instead of matching on
/// concrete variants.
pub trait ErrorClassification {
    /// Check if this error is retryable
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for ApiError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::TransientRemote)
    }

    fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::NotFound => ErrorSeverity::Info,
            ErrorKind::RateLimited | ErrorKind::TransientRemote | ErrorKind::Refresh => {
                ErrorSeverity::Warning
            }
            ErrorKind::PermanentRemote
            | ErrorKind::Authentication
            | ErrorKind::PermissionDenied
            | ErrorKind::Validation => ErrorSeverity::Error,
            ErrorKind::Unknown => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::unknown(format!("JSON error: {err}"))
    }
}

/// Invalid component configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid { field: &'static str, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub(crate) fn invalid<S: Into<String>>(field: &'static str, message: S) -> Self {
        Self::Invalid { field, message: message.into() }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
