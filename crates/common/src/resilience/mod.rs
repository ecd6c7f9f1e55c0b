//! Resilience primitives for outbound Taiga API calls
//!
//! - **Rate limiting**: [`TokenBucket`] and the [`RateLimiter`] admission
//!   policy built on it
//! - **Retry**: [`RetryPolicy`] decides, [`RetryExecutor`] drives the loop
//! - **Clock**: [`Clock`] abstraction so time-based behavior is testable
//!   with [`MockClock`]
//!
//! The intended order around a single call is rate limiter admission inside
//! the retry loop, so every retry also pays for a token.

pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{
    RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder, RateLimiterStats, TokenBucket,
    MAX_WAIT_SLICE,
};
pub use retry::{
    RetryConfig, RetryConfigBuilder, RetryDecision, RetryExecutor, RetryPolicy, DEFAULT_MAX_DELAY,
};
