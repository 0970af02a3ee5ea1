//! Shared HTTP client and error mapping for the OpenAI-style endpoints.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ParleyError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Bearer headers plus the assistants beta opt-in.
pub fn assistants_headers(api_key: &str) -> HeaderMap {
    let mut headers = bearer_headers(api_key);
    headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));
    headers
}

/// Map a non-success HTTP status and body to an error.
pub fn status_to_error(status: u16, body: &str) -> ParleyError {
    let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        401 | 403 => ParleyError::Authentication(message),
        429 => ParleyError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ParleyError::api(status, message),
    }
}

fn error_object(body: &str) -> Option<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").cloned())
}

fn extract_error_message(body: &str) -> Option<String> {
    error_object(body)?
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

fn extract_retry_after(body: &str) -> Option<u64> {
    error_object(body)?
        .get("retry_after")
        .and_then(|r| r.as_f64())
        .map(|s| (s * 1000.0) as u64)
}
