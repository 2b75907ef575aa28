//! robots.txt compliance with caching.
//!
//! Fetches and caches robots.txt files per origin, respecting a 24-hour TTL.
//! Only the `User-agent: *` block is evaluated: its `Disallow` path prefixes
//! and its `Crawl-delay`. An unreachable or 4xx robots.txt allows everything.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

use crawliq_core::Error;
use crawliq_core::url::origin_of;

/// Default TTL for robots.txt cache (24 hours).
const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum size of robots.txt to fetch (1MB).
const MAX_ROBOTS_SIZE: usize = 1024 * 1024;

/// Error type for robots.txt operations.
#[derive(Debug, thiserror::Error)]
pub enum RobotsError {
    #[error("failed to fetch robots.txt: {0}")]
    FetchError(String),

    #[error("robots.txt returned status {0}")]
    Status(u16),

    #[error("robots.txt too large")]
    TooLarge,
}

/// The rules of an origin's `User-agent: *` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsPolicy {
    /// Disallowed path prefixes.
    pub disallow: Vec<String>,
    pub crawl_delay: Option<Duration>,
}

impl RobotsPolicy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse a robots.txt body.
    ///
    /// A `User-agent: *` line opens the applicable block and any other
    /// `User-agent` line closes it. The first `Crawl-delay` in the block wins.
    pub fn parse(body: &str) -> Self {
        let mut policy = Self::default();
        let mut applies = false;

        for raw in body.lines() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match field.trim().to_ascii_lowercase().as_str() {
                "user-agent" => applies = value == "*",
                "disallow" if applies && !value.is_empty() => policy.disallow.push(value.to_string()),
                "crawl-delay" if applies && policy.crawl_delay.is_none() => {
                    if let Ok(secs) = value.parse::<f64>()
                        && secs.is_finite()
                        && secs >= 0.0
                    {
                        policy.crawl_delay = Some(Duration::from_secs_f64(secs));
                    }
                }
                _ => {}
            }
        }

        policy
    }

    /// True unless the path starts with a disallowed prefix.
    pub fn is_allowed(&self, path: &str) -> bool {
        !self.disallow.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Source of per-origin robots policies.
#[async_trait]
pub trait RobotsSource: Send + Sync {
    /// Policy for the origin of `url`. Never fails: unknown means allow-all.
    async fn policy(&self, url: &Url) -> Arc<RobotsPolicy>;
}

/// Cached robots.txt entry with timestamp.
struct CachedRobots {
    policy: Arc<RobotsPolicy>,
    fetched_at: Instant,
}

impl CachedRobots {
    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > ROBOTS_TTL
    }
}

/// In-memory cache for robots.txt policies.
///
/// Uses a simple HashMap with tokio RwLock for concurrent access.
pub struct RobotsCache {
    cache: Arc<RwLock<HashMap<String, CachedRobots>>>,
    user_agent: String,
    http: reqwest::Client,
}

impl RobotsCache {
    /// Create a new robots.txt cache.
    pub fn new(user_agent: String, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { cache: Arc::new(RwLock::new(HashMap::new())), user_agent, http })
    }

    /// Fetch robots.txt from the given URL.
    async fn fetch_robots(&self, url: &str) -> Result<RobotsPolicy, RobotsError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| RobotsError::FetchError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RobotsError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_ROBOTS_SIZE
        {
            return Err(RobotsError::TooLarge);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RobotsError::FetchError(e.to_string()))?;

        if bytes.len() > MAX_ROBOTS_SIZE {
            return Err(RobotsError::TooLarge);
        }

        Ok(RobotsPolicy::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Clear expired entries from the cache.
    pub async fn cleanup_expired(&self) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, cached| !cached.is_expired());
    }
}

#[async_trait]
impl RobotsSource for RobotsCache {
    async fn policy(&self, url: &Url) -> Arc<RobotsPolicy> {
        let origin = origin_of(url);

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&origin)
                && !cached.is_expired()
            {
                tracing::debug!("robots.txt cache hit for {}", origin);
                return cached.policy.clone();
            }
        }

        let robots_url = format!("{origin}/robots.txt");
        let policy = match self.fetch_robots(&robots_url).await {
            Ok(policy) => policy,
            Err(e) => {
                tracing::debug!("robots.txt unavailable for {} ({}), allowing all", origin, e);
                RobotsPolicy::allow_all()
            }
        };
        let policy = Arc::new(policy);

        let mut cache = self.cache.write().await;
        cache.insert(origin, CachedRobots { policy: policy.clone(), fetched_at: Instant::now() });
        policy
    }
}
