#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Clients for the rescue complaint backend.
//!
//! [`ComplaintApi`] wraps the REST endpoint that serves nearby complaints
//! and [`push::PushStream`] consumes the real-time `newComplaint`
//! WebSocket channel. Both degrade rather than fail: HTTP requests retry
//! transient errors and the push stream reconnects with backoff, since
//! the periodic re-poll backfills anything missed.

pub mod api;
pub mod location;
pub mod push;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use rescue_geo::Coordinates;

pub use api::ComplaintApi;
pub use location::IpLocation;

/// User agent sent with every HTTP request.
pub const USER_AGENT: &str = "rescue-feed/0.1";

/// Per-request timeout for REST calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    UnexpectedStatus {
        /// The status code the server returned.
        status: reqwest::StatusCode,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response shape: {message}")]
    Shape {
        /// Description of what was expected.
        message: String,
    },
}

/// Source of raw nearby complaint records.
///
/// The feed reconciler consumes this trait for both the initial fetch
/// and the periodic re-poll, which keeps it testable without a backend.
#[async_trait]
pub trait ComplaintFetcher: Send + Sync {
    /// Fetches the raw complaint records near `center`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails after retries or the
    /// response shape is unusable.
    async fn nearby(&self, center: Coordinates) -> Result<Vec<serde_json::Value>, ClientError>;
}

/// Builds the shared HTTP client used by the REST and lookup helpers.
pub(crate) fn http_client() -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()?)
}
