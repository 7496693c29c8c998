//! HTTP plumbing: client construction, headers, status mapping.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{KhojError, Result};

/// Build the reqwest client used for every request of one [`super::KhojClient`].
///
/// `timeout` bounds connection setup. Streaming responses are not cut off
/// by it; a long research answer may legitimately take minutes.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| KhojError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// JSON headers, plus a bearer token when an API key is configured.
/// Self-hosted servers without auth accept requests without one.
pub fn bearer_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {key}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// Map a non-success status and its body to an error.
pub fn status_to_error(status: u16, body: &str, retry_after: Option<&str>) -> KhojError {
    match status {
        401 | 403 => KhojError::Authentication(error_detail(body)),
        429 => KhojError::RateLimited {
            retry_after_ms: retry_after
                .and_then(parse_retry_after_header)
                .or_else(|| extract_retry_after(body)),
        },
        _ => KhojError::api(status, error_detail(body)),
    }
}

/// FastAPI error bodies carry the message in `detail`.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn parse_retry_after_header(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .map(|secs| (secs * 1000.0) as u64)
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("retry_after").and_then(|r| r.as_f64()))
        .map(|secs| (secs * 1000.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_skip_missing_key() {
        assert!(!bearer_headers(None).contains_key(AUTHORIZATION));
        assert!(!bearer_headers(Some("")).contains_key(AUTHORIZATION));
        assert_eq!(
            bearer_headers(Some("kk-1")).get(AUTHORIZATION).unwrap(),
            "Bearer kk-1"
        );
    }

    #[test]
    fn status_mapping_prefers_detail_and_header() {
        match status_to_error(401, r#"{"detail":"Invalid token"}"#, None) {
            KhojError::Authentication(msg) => assert_eq!(msg, "Invalid token"),
            other => panic!("expected authentication error, got {other:?}"),
        }
        match status_to_error(429, r#"{"retry_after": 9}"#, Some("2")) {
            KhojError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, Some(2000)),
            other => panic!("expected rate limit, got {other:?}"),
        }
        match status_to_error(500, "boom", None) {
            KhojError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
