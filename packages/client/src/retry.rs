//! HTTP retry helper for transient errors.
//!
//! REST calls go through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! automatic retry with exponential backoff for timeouts, connection
//! resets, rate limiting, and server errors. The budget is deliberately
//! small: the feed re-polls on an interval anyway, so a request that
//! stays broken is better abandoned than hammered.

use std::time::Duration;

use crate::ClientError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s) the total wait before giving
/// up is 14 seconds.
const MAX_RETRIES: u32 = 3;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by
/// `.send()`), which allows retrying any request shape.
///
/// Retries connection errors, timeouts, HTTP 429, and HTTP 5xx. Other
/// 4xx responses are permanent and fail immediately.
///
/// # Errors
///
/// Returns [`ClientError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<ClientError> = None;

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt); // 2s, 4s, 8s
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < MAX_RETRIES {
                    log::warn!("  transient error: {e}");
                    last_error = Some(ClientError::Http(e));
                    continue;
                }
                return Err(ClientError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                // 429 and 5xx are worth another attempt; other 4xx are not.
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < MAX_RETRIES {
                        log::warn!("  HTTP {status}");
                        last_error = Some(ClientError::UnexpectedStatus { status });
                        continue;
                    }
                    return Err(ClientError::UnexpectedStatus { status });
                }
                if status.is_client_error() {
                    return Err(ClientError::UnexpectedStatus { status });
                }

                return Ok(response.json().await?);
            }
        }
    }

    // Should be unreachable, but in case the loop exits without returning:
    Err(last_error.unwrap_or_else(|| ClientError::Shape {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
