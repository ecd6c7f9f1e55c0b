use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use taiga_mcp_common::auth::{RefreshedCredential, TokenRefresher};
use taiga_mcp_common::error::{ApiError, ApiResult};
use tracing::debug;

use crate::http::TaigaHttpClient;

/// Taiga endpoint exchanging a refresh token for a new auth token
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// [`TokenRefresher`] backed by Taiga's refresh endpoint
#[derive(Debug, Clone)]
pub struct TaigaTokenRefresher {
    client: TaigaHttpClient,
}

impl TaigaTokenRefresher {
    pub fn new(client: TaigaHttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenRefresher for TaigaTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshedCredential> {
        debug!(path = REFRESH_PATH, "requesting token refresh");
        let body = json!({ "refresh": refresh_token });
        let value = self
            .client
            .request_json(Method::POST, REFRESH_PATH, None, Some(&body))
            .await
            .map_err(|err| ApiError::refresh(format!("token refresh failed: {err}")))?;

        serde_json::from_value(value)
            .map_err(|err| ApiError::refresh(format!("unexpected refresh response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use taiga_mcp_common::error::ErrorKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn refresher_for(server: &MockServer) -> TaigaTokenRefresher {
        TaigaTokenRefresher::new(TaigaHttpClient::new(server.uri()).expect("http client"))
    }

    #[tokio::test]
    async fn exchanges_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(json!({"refresh": "r-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth_token": "a-2",
                "refresh": "r-2",
                "id": 42
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential =
            refresher_for(&server).refresh("r-1").await.expect("refresh succeeds");

        assert_eq!(credential, RefreshedCredential::new("a-2").with_refresh_token("r-2").with_id("42"));
    }

    #[tokio::test]
    async fn rejected_refresh_is_refresh_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is invalid"})),
            )
            .mount(&server)
            .await;

        let err = refresher_for(&server).refresh("stale").await.expect_err("rejected");

        assert_eq!(err.kind(), ErrorKind::Refresh);
        assert!(err.to_string().contains("Token is invalid"));
    }

    #[tokio::test]
    async fn malformed_response_is_refresh_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "x"})))
            .mount(&server)
            .await;

        let err = refresher_for(&server).refresh("r").await.expect_err("missing field");

        assert_eq!(err.kind(), ErrorKind::Refresh);
    }
}
