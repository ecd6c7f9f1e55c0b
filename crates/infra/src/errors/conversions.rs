//! Boundary classification of HTTP failures
//!
//! Status codes and transport errors carry more information than any
//! message heuristic, so they are mapped onto [`ApiError`] here and the
//! opaque fallback is only used for errors with nothing better to go on.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Error as HttpError;
use serde_json::Value;
use taiga_mcp_common::error::ApiError;

/// Longest response excerpt kept in an error message
const MAX_BODY_EXCERPT: usize = 200;

/// Extension trait to make the conversion logic explicit at call sites.
pub(crate) trait IntoApiError {
    fn into_api_error(self) -> ApiError;
}

impl IntoApiError for HttpError {
    fn into_api_error(self) -> ApiError {
        if self.is_timeout() {
            return ApiError::transient(format!("HTTP request timed out: {self}"));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return ApiError::transient(format!("HTTP connection failure: {self}"));
        }

        if self.is_decode() {
            return ApiError::unknown(format!("failed to decode response: {self}"));
        }

        if let Some(status) = self.status() {
            return status_error(status.as_u16(), None, None);
        }

        ApiError::from_opaque(&self)
    }
}

/// Parse a `Retry-After` header given in seconds
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Taiga puts the human-readable reason in `_error_message` or `detail`.
fn body_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for field in ["_error_message", "detail"] {
            if let Some(message) = value.get(field).and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(MAX_BODY_EXCERPT).collect())
    }
}

/// Map a non-success status to the failure kind it represents
pub(crate) fn status_error(
    status: u16,
    body: Option<&[u8]>,
    retry_after: Option<Duration>,
) -> ApiError {
    let message = body.and_then(body_message).unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("unknown status")
            .to_string()
    });

    match status {
        400 | 422 => ApiError::validation(message),
        401 => ApiError::authentication(message),
        403 => ApiError::permission_denied(message),
        404 => ApiError::not_found(message),
        429 => ApiError::RateLimited { message, retry_after },
        502..=504 => ApiError::transient(format!("HTTP {status}: {message}")),
        _ => ApiError::remote_status(status, message),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use taiga_mcp_common::error::ErrorKind;

    use super::*;

    /// Validates `status_error` behavior for every mapped status family.
    ///
    /// Assertions:
    /// - Confirms each status maps to its failure kind.
    /// - Confirms unmapped server errors stay permanent remote failures.
    #[test]
    fn test_status_mapping() {
        let cases = [
            (400, ErrorKind::Validation),
            (422, ErrorKind::Validation),
            (401, ErrorKind::Authentication),
            (403, ErrorKind::PermissionDenied),
            (404, ErrorKind::NotFound),
            (429, ErrorKind::RateLimited),
            (502, ErrorKind::TransientRemote),
            (503, ErrorKind::TransientRemote),
            (504, ErrorKind::TransientRemote),
            (500, ErrorKind::PermanentRemote),
            (409, ErrorKind::PermanentRemote),
        ];
        for (status, kind) in cases {
            assert_eq!(status_error(status, None, None).kind(), kind, "status {status}");
        }
    }

    #[test]
    fn test_taiga_error_message_is_used() {
        let err = status_error(400, Some(br#"{"_error_message":"Subject is required"}"#), None);
        assert_eq!(err, ApiError::validation("Subject is required"));

        let err = status_error(403, Some(br#"{"detail":"You do not have permission"}"#), None);
        assert_eq!(err, ApiError::permission_denied("You do not have permission"));
    }

    #[test]
    fn test_plain_body_and_empty_body() {
        let err = status_error(500, Some(b"  upstream exploded  "), None);
        assert_eq!(err, ApiError::remote_status(500, "upstream exploded"));

        let err = status_error(500, Some(b""), None);
        assert_eq!(err, ApiError::remote_status(500, "Internal Server Error"));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }
}
