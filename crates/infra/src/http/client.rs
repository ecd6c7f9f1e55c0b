use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde_json::Value;
use taiga_mcp_common::error::{ApiError, ApiResult, ConfigError};
use tracing::debug;
use url::Url;

use super::{ApiRequest, ApiTransport};
use crate::errors::{retry_after, status_error, IntoApiError};

/// JSON client bound to one Taiga instance
///
/// Does not retry on its own; retries belong to the resilience layer so
/// they are counted and rate limited like any other attempt.
#[derive(Debug, Clone)]
pub struct TaigaHttpClient {
    client: ReqwestClient,
    base_url: Url,
}

impl TaigaHttpClient {
    /// Start building a new HTTP client.
    pub fn builder(base_url: impl Into<String>) -> TaigaHttpClientBuilder {
        TaigaHttpClientBuilder::new(base_url)
    }

    /// Convenience constructor with default configuration.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Send one request and decode the JSON response
    ///
    /// Non-success statuses come back as classified [`ApiError`]s. An empty
    /// body (including `204 No Content`) decodes to `Value::Null`.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = self.endpoint(path);
        let mut builder =
            self.client.request(method.clone(), &url).header(ACCEPT, "application/json");
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, %url, "sending Taiga request");
        let response = builder.send().await.map_err(IntoApiError::into_api_error)?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let bytes = response.bytes().await.map_err(IntoApiError::into_api_error)?;
        debug!(%method, %url, %status, bytes = bytes.len(), "received Taiga response");

        if !status.is_success() {
            return Err(status_error(status.as_u16(), Some(bytes.as_ref()), retry_after));
        }

        if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(ApiError::from)
    }
}

#[async_trait]
impl ApiTransport for TaigaHttpClient {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> ApiResult<Value> {
        self.request_json(request.method.clone(), &request.path, bearer, request.body.as_ref())
            .await
    }
}

/// Builder for [`TaigaHttpClient`].
#[derive(Debug)]
pub struct TaigaHttpClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl TaigaHttpClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), timeout: Duration::from_secs(30), user_agent: None }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<TaigaHttpClient, ConfigError> {
        let base_url = Url::parse(&self.base_url).map_err(|err| ConfigError::Invalid {
            field: "base_url",
            message: format!("'{}' is not a valid URL: {err}", self.base_url),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "base_url",
                message: format!("unsupported scheme '{}'", base_url.scheme()),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timeout",
                message: "must be greater than zero".to_string(),
            });
        }

        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| ConfigError::Invalid {
            field: "http_client",
            message: err.to_string(),
        })?;

        Ok(TaigaHttpClient { client, base_url })
    }
}
