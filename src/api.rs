//! Generative-text extraction service client.
//!
//! The OCR pipeline can delegate field extraction to an external text
//! service. Every call is wrapped in a fixed retry loop (fixed count,
//! fixed delay, no backoff) and failures map to short staff-facing
//! messages. The service is a black box that takes a prompt and returns
//! text; the OCR module owns prompt construction and response parsing.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Default timeout for extraction requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed retry policy for transient transport failures.
const RETRY_COUNT: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the extraction endpoint URL:
/// - strip trailing slashes
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_endpoint(url: &str) -> String {
    let mut url = url.trim().to_string();

    if url.is_empty() {
        return url;
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }
    while url.ends_with('/') {
        url.pop();
    }
    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach extraction service at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid extraction service URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Extraction API key is invalid or expired".to_string(),
        403 => "Extraction service access denied".to_string(),
        404 => "Extraction endpoint not found".to_string(),
        429 => "Extraction service rate limit reached".to_string(),
        s if s >= 500 => format!("Extraction service error (HTTP {s})"),
        s => format!("Unexpected response from extraction service (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Extraction request
// ---------------------------------------------------------------------------

/// Pull the generated text out of the service response body. Accepts the
/// common single-field shapes (`text`, `completion`, `output`); a bare
/// string body passes through unchanged.
fn response_text(body: &str) -> Result<String, String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(s)) => Ok(s),
        Ok(json) => json
            .get("text")
            .or_else(|| json.get("completion"))
            .or_else(|| json.get("output"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "Extraction service returned an unexpected shape".to_string()),
        Err(_) => Ok(body.to_string()),
    }
}

/// Send a prompt to the extraction service and return its raw text reply.
///
/// Transport failures and non-2xx statuses are retried `RETRY_COUNT` times
/// with a fixed `RETRY_DELAY` between attempts; the last error surfaces
/// after the loop.
pub async fn request_extraction(
    endpoint: &str,
    api_key: &str,
    prompt: &str,
) -> Result<String, String> {
    let base = normalize_endpoint(endpoint);
    if base.is_empty() {
        return Err("Extraction service is not configured".to_string());
    }

    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

    let body = serde_json::json!({
        "prompt": prompt,
        "temperature": 0,
    });

    let mut last_error = String::new();
    for attempt in 0..RETRY_COUNT {
        if attempt > 0 {
            warn!(attempt, error = %last_error, "Retrying extraction request");
            tokio::time::sleep(RETRY_DELAY).await;
        }

        let response = match client
            .post(&base)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                last_error = friendly_error(&base, &e);
                continue;
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            last_error = status_error(status);
            continue;
        }

        info!(attempt, "Extraction request succeeded");
        return response_text(&text);
    }

    Err(last_error)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("ai.example.com/extract/"),
            "https://ai.example.com/extract"
        );
        assert_eq!(
            normalize_endpoint("localhost:8080"),
            "http://localhost:8080"
        );
        assert_eq!(
            normalize_endpoint("https://ai.example.com///"),
            "https://ai.example.com"
        );
        assert_eq!(normalize_endpoint("  "), "");
    }

    #[test]
    fn test_response_text_shapes() {
        assert_eq!(
            response_text(r#"{"text":"hello"}"#).unwrap(),
            "hello".to_string()
        );
        assert_eq!(
            response_text(r#"{"completion":"hi"}"#).unwrap(),
            "hi".to_string()
        );
        assert_eq!(
            response_text(r#""bare string""#).unwrap(),
            "bare string".to_string()
        );
        // Non-JSON bodies pass through
        assert_eq!(response_text("plain text").unwrap(), "plain text");
        // JSON without a known field is an error
        assert!(response_text(r#"{"data": 42}"#).is_err());
    }

    #[test]
    fn test_status_error_messages() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED),
            "Extraction API key is invalid or expired"
        );
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR).contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_rejected() {
        let err = request_extraction("", "key", "prompt").await.unwrap_err();
        assert_eq!(err, "Extraction service is not configured");
    }
}
