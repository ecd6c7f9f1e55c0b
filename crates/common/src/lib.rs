//! Client-side resilience layer for the Taiga MCP server.
//!
//! Every outbound Taiga API call passes through the components in this
//! crate: a token bucket [`RateLimiter`](resilience::RateLimiter), a
//! retrying [`RetryExecutor`](resilience::RetryExecutor), a proactively
//! refreshing [`CredentialCache`](auth::CredentialCache), a thread-safe
//! [`MetricsCollector`](observability::MetricsCollector), and a
//! bounded-concurrency [`BatchExecutor`](batch::BatchExecutor) for fanning
//! out many calls. The crate is transport-agnostic; HTTP lives in
//! `taiga-mcp-infra`.
//!
//! # Feature Tiers
//!
//! - `foundation`: error taxonomy and serde helpers
//! - `runtime` (default): the async components and their configuration
//! - `test-utils`: probes, flaky operations and global reset hooks for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod batch;
#[cfg(feature = "runtime")]
pub mod config;
#[cfg(feature = "runtime")]
pub mod observability;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{
    CredentialCache, CredentialCacheConfig, CredentialCacheManager, TokenGrant, TokenRefresher,
};
#[cfg(feature = "runtime")]
pub use batch::{BatchConfig, BatchExecutor, BatchProgress, BatchResult};
#[cfg(feature = "runtime")]
pub use config::ResilienceConfig;
#[cfg(feature = "foundation")]
pub use error::{
    ApiError, ApiResult, ConfigError, ErrorClassification, ErrorKind, ErrorSeverity,
};
#[cfg(feature = "runtime")]
pub use observability::{metrics_collector, MetricsCollector, MetricsSnapshot};
#[cfg(feature = "runtime")]
pub use resilience::{
    Clock, MockClock, RateLimiter, RateLimiterConfig, RetryConfig, RetryExecutor, RetryPolicy,
    SystemClock, TokenBucket,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
