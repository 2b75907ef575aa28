//! Application context: every long-lived component, built once at startup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::audit::prompts::{CHAT_SYSTEM, chat_context, chat_prompt};
use crate::audit::{AuditSettings, Auditor, Collaborators, OriginGate, RecrawlQueue};
use crate::extract::HtmlExtractor;
use crate::fetch::{FetchClient, FetchConfig, RobotsCache};
use crate::index::RetrievalIndex;
use crate::llm::{OpenAiClient, OpenAiConfig};
use crate::pagespeed::{MetricsProvider, PageSpeedClient, PageSpeedConfig};
use crawliq_core::{AnalysisProfile, AppConfig, AuditKey, CacheDb, CacheEntry, Error};

/// Nodes retrieved per question.
pub const ASK_TOP_K: usize = 8;

/// How often expired robots policies and idle origin slots are dropped.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Where an analysis result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Served {
    FreshCache,
    /// Served as-is; a background refresh was queued.
    StaleCache,
    Computed,
}

impl Served {
    pub fn as_str(self) -> &'static str {
        match self {
            Served::FreshCache => "fresh_cache",
            Served::StaleCache => "stale_cache",
            Served::Computed => "computed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub entry: CacheEntry,
    pub served_from: Served,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub id: String,
    pub kind: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Shared handle to the cache, index, auditor and recrawl queue.
pub struct AppContext {
    cache: CacheDb,
    index: Arc<RetrievalIndex>,
    auditor: Arc<Auditor>,
    gate: Arc<OriginGate>,
    queue: RecrawlQueue,
    profile: AnalysisProfile,
}

impl AppContext {
    /// Build production clients from configuration. Must be called within a tokio runtime.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let cache = CacheDb::open(&config.db_path).await?;

        let robots = Arc::new(RobotsCache::new(config.user_agent.clone(), config.timeout())?);

        let metrics = match PageSpeedConfig::from_app_config(config) {
            Some(psi) => {
                let client = PageSpeedClient::new(psi).map_err(|e| Error::ProviderFailed(e.to_string()))?;
                Some(Arc::new(client) as Arc<dyn MetricsProvider>)
            }
            None => {
                tracing::info!("no PageSpeed key configured; performance metrics disabled");
                None
            }
        };

        let llm = Arc::new(OpenAiClient::new(OpenAiConfig::from(config))?);
        let index = Arc::new(RetrievalIndex::new(llm.clone(), llm, config.index_capacity));

        let parts = Collaborators {
            fetcher: Arc::new(FetchClient::new(FetchConfig::from(config))?),
            robots: robots.clone(),
            extractor: Arc::new(HtmlExtractor::new()?),
            metrics,
        };

        let ctx = Self::new(config, cache, index, parts)?;

        let gate = ctx.gate.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                robots.cleanup_expired().await;
                gate.prune().await;
            }
        });

        Ok(ctx)
    }

    /// Assemble a context around already-built collaborators.
    pub fn new(
        config: &AppConfig, cache: CacheDb, index: Arc<RetrievalIndex>, parts: Collaborators,
    ) -> Result<Self, Error> {
        let settings = AuditSettings::from_config(config)?;
        let profile = AnalysisProfile { metrics_enabled: parts.metrics.is_some(), ..config.analysis_profile() };

        let gate = Arc::new(OriginGate::new(parts.robots.clone(), config.default_crawl_delay()));
        let auditor = Arc::new(Auditor::new(cache.clone(), index.clone(), parts, settings));
        let queue = RecrawlQueue::start(auditor.clone(), gate.clone(), config.recrawl_concurrency, profile.clone());

        tracing::info!(
            generation_model = %profile.generation_model,
            embedding_model = %profile.embedding_model,
            metrics_enabled = profile.metrics_enabled,
            "application context ready"
        );
        Ok(Self { cache, index, auditor, gate, queue, profile })
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn profile(&self) -> &AnalysisProfile {
        &self.profile
    }

    /// Resolve once no background refresh is queued or running.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    async fn cached(&self, audit_hash: &str) -> Result<Option<CacheEntry>, Error> {
        match self.cache.get_entry(audit_hash).await {
            Err(Error::CacheMiss(msg)) => {
                tracing::warn!(audit_hash, "treating unreadable cache entry as a miss: {}", msg);
                Ok(None)
            }
            other => other,
        }
    }

    /// Serve an audit with stale-while-revalidate semantics.
    ///
    /// A fully fresh entry is returned as-is. A stale entry is returned
    /// immediately and one background refresh is queued. Without an entry
    /// the audit is computed in the foreground.
    pub async fn analyze(&self, raw_url: &str) -> Result<Analysis, Error> {
        let key = self.profile.derive_key(raw_url)?;

        if let Some(entry) = self.cached(&key.audit_hash).await? {
            if entry.is_fully_fresh(Utc::now(), self.auditor.metrics_enabled()) {
                tracing::debug!(url = %key.normalized_url, "cache hit (fresh)");
                return Ok(Analysis { entry, served_from: Served::FreshCache });
            }

            tracing::debug!(url = %key.normalized_url, "cache hit (stale); queueing refresh");
            if let Err(e) = self.queue.enqueue(raw_url) {
                tracing::warn!(url = %key.normalized_url, error = %e, "could not queue refresh");
            }
            return Ok(Analysis { entry, served_from: Served::StaleCache });
        }

        tracing::debug!(url = %key.normalized_url, "cache miss");
        let entry = self.auditor.run(&key, raw_url, None).await?;
        Ok(Analysis { entry, served_from: Served::Computed })
    }

    /// Expire the page artifacts of `raw_url` and queue a recrawl.
    pub async fn invalidate(&self, raw_url: &str) -> Result<AuditKey, Error> {
        let key = self.profile.derive_key(raw_url)?;
        let existed = self.cache.expire_now(&key.audit_hash).await?;
        tracing::info!(url = %key.normalized_url, existed, "audit invalidated");
        self.queue.enqueue(raw_url)
    }

    /// Answer a question from indexed audits, optionally scoped to one audit.
    pub async fn ask(&self, question: &str, audit_hash: Option<&str>) -> Result<Answer, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".into()));
        }

        let hits = match audit_hash {
            Some(hash) => {
                if !self.index.contains_audit(hash).await
                    && let Some(entry) = self.cached(hash).await?
                {
                    tracing::debug!(audit_hash = hash, "re-indexing cached audit");
                    self.auditor.index_entry(&entry).await;
                }
                self.index.query_scoped(question, ASK_TOP_K, hash).await?
            }
            None => self.index.query(question, ASK_TOP_K).await?,
        };

        let prompt = chat_prompt(&chat_context(&hits), question);
        let answer = self.index.generate(CHAT_SYSTEM, &prompt).await?;
        let citations = hits
            .into_iter()
            .map(|hit| Citation { id: hit.id, kind: hit.meta.kind, score: hit.score })
            .collect();

        Ok(Answer { answer, citations })
    }
}
