//! Bearer credential caching
//!
//! [`CredentialCache`] keeps one principal's token fresh; the
//! [`CredentialCacheManager`] hands out one cache per opaque key.
//!
//! ```text
//! get_valid_token ──► valid & outside window? ──yes──► hit
//!                            │ no (miss)
//!                            ▼
//!                refresher + refresh token? ──no──► current token or None
//!                            │ yes
//!                            ▼
//!                      TokenRefresher ──err──► current token, or the error
//! ```

pub mod credential_cache;
pub mod manager;
pub mod traits;
pub mod types;

pub use credential_cache::CredentialCache;
pub use manager::CredentialCacheManager;
pub use traits::{refresh_fn, RefreshFn, TokenRefresher};
pub use types::{
    CredentialCacheConfig, CredentialCacheMetrics, CredentialState, RefreshedCredential,
    TokenGrant,
};
