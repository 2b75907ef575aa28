//! Unified error types for crawliq.
//!
//! Variants group into the classes the pipeline reasons about: caller input
//! (`InvalidInput`), origin policy (`Blocked`), fetch failures
//! (`FetchTimeout`, `FetchTooLarge`, `FetchFailed`), provider failures
//! (`ProviderFailed`, `DimensionMismatch`), persistence (`CacheWrite`,
//! `Database`, `MigrationFailed`) and the background queue (`QueueClosed`).

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the crawliq workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (malformed URL, empty question).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The origin's robots.txt disallows fetching the target.
    #[error("BLOCKED: {0}")]
    Blocked(String),

    /// Page extraction failed.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// No cache entry found for the given hash.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Persisting a cache entry failed.
    #[error("CACHE_WRITE_FAILED: {0}")]
    CacheWrite(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network error or an unexpected (non-2xx, non-304) status.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// Embedding or generation provider failed.
    #[error("PROVIDER_FAILED: {0}")]
    ProviderFailed(String),

    /// An embedding batch does not match the index dimensionality.
    #[error("DIMENSION_MISMATCH: index holds {expected}-d vectors, batch has {actual}-d")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The background recrawl scheduler is not running.
    #[error("QUEUE_CLOSED: recrawl queue is not running")]
    QueueClosed,
}

impl Error {
    /// True for the fetch-failure class (network, timeout, size, status).
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::FetchTimeout(_) | Error::FetchTooLarge(_) | Error::FetchFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::ExtractFailed(msg) => (-32000, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CacheWrite(msg) => (-32003, msg.clone()),
            Error::Blocked(msg) => (-32005, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::FetchFailed(msg) => (-32008, msg.clone()),
            Error::ProviderFailed(msg) => (-32009, msg.clone()),
            Error::DimensionMismatch { .. } => (-32010, err.to_string()),
            Error::QueueClosed => (-32011, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Blocked("https://example.com/private".to_string());
        assert!(err.to_string().starts_with("BLOCKED"));
        assert!(err.to_string().contains("/private"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = Error::DimensionMismatch { expected: 3, actual: 4 };
        assert_eq!(err.to_string(), "DIMENSION_MISMATCH: index holds 3-d vectors, batch has 4-d");
    }

    #[test]
    fn test_fetch_failure_class() {
        assert!(Error::FetchTimeout("slow".into()).is_fetch_failure());
        assert!(Error::FetchFailed("status 500".into()).is_fetch_failure());
        assert!(!Error::Blocked("nope".into()).is_fetch_failure());
        assert!(!Error::ProviderFailed("down".into()).is_fetch_failure());
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::InvalidInput("bad url".into()).into();
        assert_eq!(mcp_err.code.0, -32602);
    }
}
