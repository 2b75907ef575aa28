//! PageSpeed Insights client error types.

use std::sync::Arc;

/// Errors from the PageSpeed Insights client.
#[derive(Debug, thiserror::Error)]
pub enum PageSpeedError {
    /// No API key configured.
    #[error("missing API key: CRAWLIQ_PSI_API_KEY not set")]
    MissingApiKey,

    /// Authentication failed (invalid or restricted API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for PageSpeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { PageSpeedError::Timeout } else { PageSpeedError::Network(Arc::new(err)) }
    }
}
