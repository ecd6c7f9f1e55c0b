//! Refresh collaborator abstraction
//!
//! The cache never talks to the network itself; whoever owns the transport
//! supplies a [`TokenRefresher`]. Tests and small callers can wrap an async
//! closure with [`refresh_fn`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::RefreshedCredential;
use crate::error::ApiResult;

/// Exchanges a refresh token for a new credential
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshedCredential>;
}

#[async_trait]
impl<T: TokenRefresher + ?Sized> TokenRefresher for Arc<T> {
    async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshedCredential> {
        (**self).refresh(refresh_token).await
    }
}

/// [`TokenRefresher`] backed by an async closure
#[derive(Clone)]
pub struct RefreshFn<F> {
    f: F,
}

/// Wrap an async closure as a [`TokenRefresher`]
pub fn refresh_fn<F, Fut>(f: F) -> RefreshFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ApiResult<RefreshedCredential>> + Send + 'static,
{
    RefreshFn { f }
}

#[async_trait]
impl<F, Fut> TokenRefresher for RefreshFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ApiResult<RefreshedCredential>> + Send + 'static,
{
    async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshedCredential> {
        (self.f)(refresh_token.to_string()).await
    }
}

impl<F> std::fmt::Debug for RefreshFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshFn")
    }
}
