use async_trait::async_trait;
use serde_json::Value;
use taiga_mcp_common::error::ApiResult;

use super::ApiRequest;

/// Seam between the gateway and the wire
///
/// Implementations report failures already classified as [`ApiError`]s so
/// the retry policy can act on them.
///
/// [`ApiError`]: taiga_mcp_common::error::ApiError
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> ApiResult<Value>;
}
