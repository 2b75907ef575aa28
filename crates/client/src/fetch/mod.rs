//! HTTP fetch pipeline with conditional revalidation and robots.txt compliance.
//!
//! ### Conditional Requests
//! - Sends `If-None-Match` / `If-Modified-Since` from the cached validators.
//! - `304 Not Modified` is a normal outcome, not an error.
//! - Any other non-2xx status is a fetch failure.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! ### robots.txt Compliance
//! - Fetch and cache `robots.txt` per origin (24h cache).
//! - Evaluate the `User-agent: *` block only.

pub mod robots;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use robots::{RobotsCache, RobotsError, RobotsPolicy, RobotsSource};

use crawliq_core::cache::hash::sha256_hex;
use crawliq_core::{AppConfig, Error, Validators};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "crawliq/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "crawliq/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// A full (2xx) page response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// The final URL after redirects
    pub final_url: String,
    pub status: u16,
    pub html: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// SHA-256 hex of the raw body
    pub content_hash: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Result of a conditional fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The origin answered 304; the cached representation is still current.
    NotModified { final_url: String, etag: Option<String>, last_modified: Option<String> },
    Modified(FetchedPage),
}

/// Conditional page fetching.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, sending the validators as conditional request headers.
    async fn fetch_conditional(&self, url: &str, validators: &Validators) -> Result<FetchOutcome, Error>;
}

/// Build the conditional request headers for the given validators.
pub fn conditional_headers(validators: &Validators) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    if let Some(etag) = validators.etag.as_deref()
        && let Ok(value) = header::HeaderValue::from_str(etag)
    {
        headers.insert(header::IF_NONE_MATCH, value);
    }
    if let Some(last_modified) = validators.last_modified.as_deref()
        && let Ok(value) = header::HeaderValue::from_str(last_modified)
    {
        headers.insert(header::IF_MODIFIED_SINCE, value);
    }
    headers
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::FetchFailed(format!("network error: {err}")) }
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl PageFetcher for FetchClient {
    async fn fetch_conditional(&self, url: &str, validators: &Validators) -> Result<FetchOutcome, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .headers(conditional_headers(validators))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let etag = header_string(response.headers(), header::ETAG);
        let last_modified = header_string(response.headers(), header::LAST_MODIFIED);

        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(url, "not modified in {}ms", start.elapsed().as_millis());
            return Ok(FetchOutcome::NotModified { final_url, etag, last_modified });
        }

        if !status.is_success() {
            return Err(Error::FetchFailed(format!("status {} for {url}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(e.to_string())
            } else {
                Error::FetchFailed(format!("failed to read response: {e}"))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchOutcome::Modified(FetchedPage {
            final_url,
            status: status.as_u16(),
            content_hash: sha256_hex(&bytes),
            html: String::from_utf8_lossy(&bytes).into_owned(),
            etag,
            last_modified,
            fetch_ms,
        }))
    }
}
