//! PageSpeed Insights API client.
//!
//! Provides the external performance metrics for a page: field data (LCP,
//! CLS, INP) and Lighthouse category scores.
//!
//! ### Specification
//!
//! - **Endpoint**: `https://www.googleapis.com/pagespeedonline/v5/runPagespeed`
//! - **Authentication**: `key` query parameter.
//! - **Request**: mobile strategy, PERFORMANCE and SEO categories.
//! - **Degradation**: any failure yields no metrics and a warning; the audit continues.

pub mod error;
pub mod response;

pub use error::PageSpeedError;
pub use response::PageSpeedApiResponse;

use async_trait::async_trait;
use reqwest::header;
use std::time::{Duration, Instant};

use crawliq_core::{AppConfig, PerformanceMetrics};

/// Default base URL for the PageSpeed Insights API.
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/pagespeedonline/v5";

/// PageSpeed runs a full Lighthouse pass; it is slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Source of external performance metrics.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Metrics for `url`, or None when they could not be obtained.
    async fn fetch_metrics(&self, url: &str) -> Option<PerformanceMetrics>;
}

/// PageSpeed client configuration.
#[derive(Debug, Clone)]
pub struct PageSpeedConfig {
    pub api_key: String,
    /// Base URL (default: https://www.googleapis.com/pagespeedonline/v5).
    pub base_url: String,
    /// Request timeout (default: 60s).
    pub timeout: Duration,
    /// `mobile` or `desktop` (default: mobile).
    pub strategy: String,
    pub user_agent: String,
}

impl Default for PageSpeedConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            strategy: "mobile".to_string(),
            user_agent: "crawliq/0.1".to_string(),
        }
    }
}

impl PageSpeedConfig {
    /// Build from the application config. None when no key is configured.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let api_key = config.psi_api_key.as_deref().filter(|key| !key.is_empty())?;
        Some(Self { api_key: api_key.to_string(), user_agent: config.user_agent.clone(), ..Default::default() })
    }
}

/// PageSpeed Insights API client.
#[derive(Debug, Clone)]
pub struct PageSpeedClient {
    http: reqwest::Client,
    config: PageSpeedConfig,
}

impl PageSpeedClient {
    /// Create a new client with the given configuration.
    pub fn new(config: PageSpeedConfig) -> Result<Self, PageSpeedError> {
        if config.api_key.is_empty() {
            return Err(PageSpeedError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(PageSpeedError::from)?;

        Ok(Self { http, config })
    }

    /// Request parameters for one run, in the order they are sent.
    fn query_params<'a>(&'a self, url: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("url", url),
            ("category", "PERFORMANCE"),
            ("category", "SEO"),
            ("strategy", self.config.strategy.as_str()),
            ("key", self.config.api_key.as_str()),
        ]
    }

    /// Run PageSpeed Insights for a URL.
    pub async fn run(&self, url: &str) -> Result<PerformanceMetrics, PageSpeedError> {
        let start = Instant::now();
        let endpoint = format!("{}/runPagespeed", self.config.base_url);

        tracing::debug!("running PageSpeed Insights: url={}", url);

        let http_response = self
            .http
            .get(&endpoint)
            .header("Accept", "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(&self.query_params(url))
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!("PageSpeed API response status: {}", status);

        if status == 401 || status == 403 {
            return Err(PageSpeedError::AuthError);
        }

        if status == 429 {
            return Err(PageSpeedError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(PageSpeedError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let api_response: PageSpeedApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| PageSpeedError::Parse(e.to_string()))?;

        tracing::debug!("PageSpeed run completed in {:?}", start.elapsed());

        Ok(PerformanceMetrics::from(api_response))
    }
}

#[async_trait]
impl MetricsProvider for PageSpeedClient {
    async fn fetch_metrics(&self, url: &str) -> Option<PerformanceMetrics> {
        match self.run(url).await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!(url, error = %e, "PageSpeed metrics unavailable");
                None
            }
        }
    }
}
