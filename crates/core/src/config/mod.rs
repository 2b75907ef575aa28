//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CRAWLIQ_*)
//! 2. TOML config file (if CRAWLIQ_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::key::AnalysisProfile;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CRAWLIQ_*)
/// 2. TOML config file (if CRAWLIQ_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via CRAWLIQ_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for page and robots.txt requests.
    ///
    /// Set via CRAWLIQ_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via CRAWLIQ_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via CRAWLIQ_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to respect robots.txt rules.
    ///
    /// Set via CRAWLIQ_RESPECT_ROBOTS environment variable.
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// OpenAI-compatible API key for embeddings and generation.
    ///
    /// Set via CRAWLIQ_OPENAI_API_KEY environment variable.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// PageSpeed Insights key. Performance metrics are collected only when set.
    ///
    /// Set via CRAWLIQ_PSI_API_KEY environment variable.
    #[serde(default)]
    pub psi_api_key: Option<String>,

    /// Lifetime of the page artifact, seconds.
    #[serde(default = "default_page_ttl_secs")]
    pub page_ttl_secs: u64,

    /// Lifetime of the metrics artifact, seconds.
    #[serde(default = "default_metrics_ttl_secs")]
    pub metrics_ttl_secs: u64,

    /// Maximum concurrent background recrawls.
    #[serde(default = "default_recrawl_concurrency")]
    pub recrawl_concurrency: usize,

    /// Spacing between requests to one origin when robots.txt names no crawl-delay.
    #[serde(default = "default_crawl_delay_ms")]
    pub default_crawl_delay_ms: u64,

    /// Maximum nodes held by the retrieval index before the oldest are evicted.
    #[serde(default = "default_index_capacity")]
    pub index_capacity: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./crawliq-cache.sqlite")
}

fn default_user_agent() -> String {
    "crawliq/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_generation_model() -> String {
    "gpt-5".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_page_ttl_secs() -> u64 {
    6 * 60 * 60
}

fn default_metrics_ttl_secs() -> u64 {
    48 * 60 * 60
}

fn default_recrawl_concurrency() -> usize {
    5
}

fn default_crawl_delay_ms() -> u64 {
    1_000
}

fn default_index_capacity() -> usize {
    4_096
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            respect_robots: true,
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            psi_api_key: None,
            page_ttl_secs: default_page_ttl_secs(),
            metrics_ttl_secs: default_metrics_ttl_secs(),
            recrawl_concurrency: default_recrawl_concurrency(),
            default_crawl_delay_ms: default_crawl_delay_ms(),
            index_capacity: default_index_capacity(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    pub fn metrics_ttl(&self) -> Duration {
        Duration::from_secs(self.metrics_ttl_secs)
    }

    pub fn default_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.default_crawl_delay_ms)
    }

    /// Performance metrics are part of the analysis only when a PSI key is configured.
    pub fn metrics_enabled(&self) -> bool {
        self.psi_api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// The configuration facets that feed the audit hash.
    pub fn analysis_profile(&self) -> AnalysisProfile {
        AnalysisProfile {
            generation_model: self.generation_model.clone(),
            embedding_model: self.embedding_model.clone(),
            metrics_enabled: self.metrics_enabled(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CRAWLIQ_`
    /// 2. TOML file from `CRAWLIQ_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CRAWLIQ_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CRAWLIQ_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the OpenAI API key is available.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "openai_api_key".into(),
                hint: "Set CRAWLIQ_OPENAI_API_KEY environment variable".into(),
            })
    }
}
