//! Audit orchestration.
//!
//! ```text
//! CHECK_ROBOTS -> FETCH -> (PARSE_AND_SCORE | SKIP_ON_304) -> GENERATE_SUGGESTIONS? -> INDEX -> PERSIST
//! ```
//!
//! ### Skip Rules
//! - 304 with fresh metrics (or metrics disabled): only the page expiry moves.
//! - 304 with stale metrics: metrics and the scores derived from them are
//!   recomputed; findings and suggestions carry over.
//! - 200 with an unchanged body fingerprint: suggestions carry over verbatim,
//!   no generation call.
//! - A full run that gets no metrics keeps the cached metrics while they are fresh.

pub mod checks;
pub mod gate;
pub mod prompts;
pub mod queue;
pub mod scoring;

pub use checks::run_checks;
pub use gate::OriginGate;
pub use queue::{Job, RecrawlQueue};
pub use scoring::score;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

use crate::extract::Extractor;
use crate::fetch::{FetchOutcome, FetchedPage, PageFetcher, RobotsSource};
use crate::index::{Chunk, NodeMeta, RetrievalIndex};
use crate::pagespeed::MetricsProvider;
use crawliq_core::{
    AppConfig, AuditKey, AuditReport, CacheDb, CacheEntry, Error, Excerpt, PerformanceMetrics, Validators,
};
use prompts::{SUGGESTIONS_SYSTEM, dom_evidence, suggestions_prompt};

/// Index chunk kinds, in the order they are indexed.
pub const CHUNK_KINDS: [&str; 3] = ["summary", "findings", "suggestions"];

/// Freshness and policy knobs for audit runs.
#[derive(Debug, Clone, Copy)]
pub struct AuditSettings {
    pub page_ttl: TimeDelta,
    pub metrics_ttl: TimeDelta,
    pub respect_robots: bool,
}

impl AuditSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let ttl = |d: std::time::Duration, field: &str| {
            TimeDelta::from_std(d).map_err(|e| Error::InvalidInput(format!("{field}: {e}")))
        };
        Ok(Self {
            page_ttl: ttl(config.page_ttl(), "page_ttl_secs")?,
            metrics_ttl: ttl(config.metrics_ttl(), "metrics_ttl_secs")?,
            respect_robots: config.respect_robots,
        })
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self { page_ttl: TimeDelta::hours(6), metrics_ttl: TimeDelta::hours(48), respect_robots: true }
    }
}

/// The pluggable collaborators an audit run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub robots: Arc<dyn RobotsSource>,
    pub extractor: Arc<dyn Extractor>,
    /// None disables performance metrics.
    pub metrics: Option<Arc<dyn MetricsProvider>>,
}

/// Runs audits and persists their results.
pub struct Auditor {
    cache: CacheDb,
    index: Arc<RetrievalIndex>,
    parts: Collaborators,
    settings: AuditSettings,
}

/// The three retrieval chunks for a cached report.
pub fn report_chunks(entry: &CacheEntry) -> Vec<Chunk> {
    let report = &entry.report;
    let summary = format!(
        "Overall score {}. {}.",
        report.scores.overall,
        PerformanceMetrics::summary_line(report.metrics.as_ref())
    );
    let findings = if report.findings.is_empty() {
        "No findings.".to_string()
    } else {
        report
            .findings
            .iter()
            .map(|f| format!("[{}] {} ({}) {}", f.id, f.message, f.severity.as_str(), f.evidence.as_deref().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    CHUNK_KINDS
        .into_iter()
        .zip([summary, findings, report.suggestions.clone()])
        .map(|(kind, text)| Chunk {
            id: format!("{}:{kind}", entry.audit_hash),
            text,
            meta: NodeMeta {
                kind: kind.to_string(),
                audit_hash: Some(entry.audit_hash.clone()),
                url: Some(report.final_url.clone()),
            },
        })
        .collect()
}

fn merge_validators(fresh: Validators, previous: Option<&Validators>) -> Validators {
    match previous {
        Some(old) => Validators {
            etag: fresh.etag.or_else(|| old.etag.clone()),
            last_modified: fresh.last_modified.or_else(|| old.last_modified.clone()),
            content_hash: fresh.content_hash.or_else(|| old.content_hash.clone()),
        },
        None => fresh,
    }
}

impl Auditor {
    pub fn new(cache: CacheDb, index: Arc<RetrievalIndex>, parts: Collaborators, settings: AuditSettings) -> Self {
        Self { cache, index, parts, settings }
    }

    pub fn metrics_enabled(&self) -> bool {
        self.parts.metrics.is_some()
    }

    /// Load the cached entry (if any) and run against it.
    pub async fn refresh(&self, key: &AuditKey, raw_url: &str) -> Result<CacheEntry, Error> {
        let previous = match self.cache.get_entry(&key.audit_hash).await {
            Ok(previous) => previous,
            Err(Error::CacheMiss(msg)) => {
                tracing::warn!(audit_hash = %key.audit_hash, "ignoring unreadable cache entry: {}", msg);
                None
            }
            Err(e) => return Err(e),
        };
        self.run(key, raw_url, previous).await
    }

    /// Run one audit. `previous` supplies the conditional-fetch validators and
    /// the artifacts that may be carried over.
    ///
    /// # Errors
    ///
    /// - `Blocked` if robots.txt disallows the path
    /// - `FetchTimeout`, `FetchTooLarge`, `FetchFailed` from the fetch
    /// - `ExtractFailed` from extraction
    /// - `ProviderFailed` from suggestion generation
    /// - `CacheWrite` if the result cannot be persisted
    pub async fn run(&self, key: &AuditKey, raw_url: &str, previous: Option<CacheEntry>) -> Result<CacheEntry, Error> {
        let url = Url::parse(&key.normalized_url)
            .map_err(|e| Error::InvalidInput(format!("{}: {e}", key.normalized_url)))?;

        if self.settings.respect_robots {
            let policy = self.parts.robots.policy(&url).await;
            if !policy.is_allowed(url.path()) {
                return Err(Error::Blocked(format!("robots.txt disallows {}", key.normalized_url)));
            }
        }

        let validators = previous.as_ref().map(|p| p.validators.clone()).unwrap_or_default();
        let outcome = self.parts.fetcher.fetch_conditional(&key.normalized_url, &validators).await?;

        match (outcome, previous) {
            (FetchOutcome::NotModified { etag, last_modified, .. }, Some(previous)) => {
                let fresh = Validators { etag, last_modified, content_hash: None };
                self.revalidated(previous, fresh).await
            }
            (FetchOutcome::NotModified { final_url, .. }, None) => {
                Err(Error::FetchFailed(format!("304 from {final_url} without a cached entry")))
            }
            (FetchOutcome::Modified(page), previous) => self.compute(key, raw_url, page, previous).await,
        }
    }

    /// 304 path: extend the page expiry, refreshing metrics only when they are stale.
    async fn revalidated(&self, mut entry: CacheEntry, fresh: Validators) -> Result<CacheEntry, Error> {
        let now = Utc::now();
        let page_expires_at = now + self.settings.page_ttl;

        let metrics = match &self.parts.metrics {
            Some(provider) if !entry.metrics_fresh(now) => provider.fetch_metrics(&entry.report.final_url).await,
            _ => None,
        };

        let Some(metrics) = metrics else {
            tracing::info!(url = %entry.normalized_url, "not modified; extending page expiry");
            return self.extend_only(entry, page_expires_at).await;
        };

        tracing::info!(url = %entry.normalized_url, "not modified; refreshing metrics");
        entry.report.scores = score(&entry.report.findings, Some(&metrics));
        entry.report.metrics = Some(metrics);
        entry.validators = merge_validators(fresh, Some(&entry.validators));
        entry.metrics_expires_at = now + self.settings.metrics_ttl;
        entry.page_expires_at = page_expires_at;
        entry.refreshed_at = now;

        self.index_entry(&entry).await;
        self.cache.put_entry(&entry).await?;
        Ok(entry)
    }

    async fn extend_only(&self, mut entry: CacheEntry, page_expires_at: DateTime<Utc>) -> Result<CacheEntry, Error> {
        self.cache.extend_page_expiry(&entry.audit_hash, page_expires_at).await?;
        entry.page_expires_at = page_expires_at;
        Ok(entry)
    }

    /// 200 path: the full pipeline.
    async fn compute(
        &self, key: &AuditKey, raw_url: &str, page: FetchedPage, previous: Option<CacheEntry>,
    ) -> Result<CacheEntry, Error> {
        let base = Url::parse(&page.final_url)
            .map_err(|e| Error::ExtractFailed(format!("invalid final URL {}: {e}", page.final_url)))?;
        let attrs = self.parts.extractor.extract(&page.html, &base)?;
        let findings = run_checks(&attrs);
        tracing::info!(url = %key.normalized_url, findings = findings.len(), "page analyzed");

        let fetched = match &self.parts.metrics {
            Some(provider) => provider.fetch_metrics(&page.final_url).await,
            None => None,
        };

        let now = Utc::now();
        let (metrics, metrics_expires_at) = match (fetched, &previous) {
            (Some(metrics), _) => (Some(metrics), now + self.settings.metrics_ttl),
            (None, Some(prev)) if prev.report.metrics.is_some() && prev.metrics_fresh(now) => {
                (prev.report.metrics.clone(), prev.metrics_expires_at)
            }
            // Already expired so the next revalidation retries the provider.
            (None, _) if self.metrics_enabled() => (None, now),
            (None, _) => (None, now + self.settings.metrics_ttl),
        };

        let scores = score(&findings, metrics.as_ref());
        let evidence = dom_evidence(&attrs);

        let unchanged = previous
            .as_ref()
            .filter(|prev| prev.validators.content_hash.as_deref() == Some(page.content_hash.as_str()));
        let suggestions = match unchanged {
            Some(prev) => {
                tracing::debug!(url = %key.normalized_url, "content unchanged; reusing suggestions");
                prev.report.suggestions.clone()
            }
            None => {
                let prompt = suggestions_prompt(&findings, &evidence, metrics.as_ref());
                self.index.generate(SUGGESTIONS_SYSTEM, &prompt).await?
            }
        };

        let fresh = Validators {
            etag: page.etag,
            last_modified: page.last_modified,
            content_hash: Some(page.content_hash),
        };
        let entry = CacheEntry {
            audit_hash: key.audit_hash.clone(),
            url: raw_url.to_string(),
            normalized_url: key.normalized_url.clone(),
            report: AuditReport {
                url: raw_url.to_string(),
                final_url: page.final_url,
                status: page.status,
                findings,
                metrics,
                scores,
                suggestions,
                excerpts: vec![Excerpt { id: "dom".into(), text: evidence }],
            },
            status_code: page.status,
            validators: merge_validators(fresh, previous.as_ref().map(|p| &p.validators)),
            page_expires_at: now + self.settings.page_ttl,
            metrics_expires_at,
            refreshed_at: now,
        };

        self.index_entry(&entry).await;
        self.cache.put_entry(&entry).await?;
        tracing::info!(url = %key.normalized_url, overall = entry.report.scores.overall, "audit stored");
        Ok(entry)
    }

    /// Index the report's chunks. Failures are logged, never returned.
    pub async fn index_entry(&self, entry: &CacheEntry) {
        if let Err(e) = self.index.add_many(report_chunks(entry)).await {
            tracing::warn!(audit_hash = %entry.audit_hash, error = %e, "indexing failed; report kept");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::HtmlExtractor;
    use crate::fetch::RobotsPolicy;
    use crate::index::tests::{FakeEmbedder, FakeGenerator};
    use async_trait::async_trait;
    use crawliq_core::{AnalysisProfile, LighthouseScores};
    use gate::tests::FakeRobots;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    pub(crate) const NOINDEX_PAGE: &str = r#"<html><head><meta name="robots" content="noindex, follow"></head>
        <body><h1>Welcome</h1><p>Short page.</p></body></html>"#;

    pub(crate) const GOOD_PAGE: &str = r#"<html lang="en"><head><title>A perfectly reasonable page title</title>
        <link rel="canonical" href="https://example.com/"></head><body><h1>Welcome</h1></body></html>"#;

    /// One scripted fetch result.
    pub(crate) enum Step {
        Page(FetchOutcome),
        Fail,
        Panic,
    }

    pub(crate) fn modified(html: &str, etag: Option<&str>) -> FetchOutcome {
        FetchOutcome::Modified(FetchedPage {
            final_url: "https://example.com/".into(),
            status: 200,
            html: html.to_string(),
            etag: etag.map(String::from),
            last_modified: None,
            content_hash: crawliq_core::cache::hash::sha256_hex(html.as_bytes()),
            fetch_ms: 1,
        })
    }

    pub(crate) fn not_modified() -> FetchOutcome {
        FetchOutcome::NotModified { final_url: "https://example.com/".into(), etag: None, last_modified: None }
    }

    /// Plays scripted steps in order, then repeats `fallback`.
    pub(crate) struct FakeFetcher {
        steps: Mutex<VecDeque<Step>>,
        fallback: FetchOutcome,
        delay: Duration,
        active: AtomicUsize,
        pub max_active: AtomicUsize,
        pub calls: Mutex<Vec<(String, Validators, Instant)>>,
    }

    impl FakeFetcher {
        pub(crate) fn new(fallback: FetchOutcome) -> Self {
            Self {
                steps: Mutex::new(VecDeque::new()),
                fallback,
                delay: Duration::ZERO,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn push(&self, step: Step) {
            self.steps.lock().unwrap().push_back(step);
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub(crate) fn last_validators(&self) -> Validators {
            self.calls.lock().unwrap().last().map(|c| c.1.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch_conditional(&self, url: &str, validators: &Validators) -> Result<FetchOutcome, Error> {
            self.calls.lock().unwrap().push((url.to_string(), validators.clone(), Instant::now()));
            let step = self.steps.lock().unwrap().pop_front();

            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            match step {
                Some(Step::Page(outcome)) => Ok(outcome),
                Some(Step::Fail) => Err(Error::FetchFailed("status 503".into())),
                Some(Step::Panic) => panic!("fetcher exploded"),
                None => Ok(self.fallback.clone()),
            }
        }
    }

    pub(crate) struct FakeMetrics {
        pub next: Mutex<Option<PerformanceMetrics>>,
        pub calls: AtomicUsize,
    }

    impl FakeMetrics {
        pub(crate) fn new(metrics: Option<PerformanceMetrics>) -> Self {
            Self { next: Mutex::new(metrics), calls: AtomicUsize::new(0) }
        }

        pub(crate) fn set(&self, metrics: Option<PerformanceMetrics>) {
            *self.next.lock().unwrap() = metrics;
        }
    }

    #[async_trait]
    impl MetricsProvider for FakeMetrics {
        async fn fetch_metrics(&self, _url: &str) -> Option<PerformanceMetrics> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.next.lock().unwrap().clone()
        }
    }

    pub(crate) fn lighthouse(performance: u32, seo: u32) -> PerformanceMetrics {
        PerformanceMetrics {
            lcp: Some(2.0),
            lighthouse: LighthouseScores { performance: Some(performance), seo: Some(seo), ..Default::default() },
            ..Default::default()
        }
    }

    /// An auditor wired to fakes, plus handles to inspect them.
    pub(crate) struct Harness {
        pub auditor: Arc<Auditor>,
        pub cache: CacheDb,
        pub index: Arc<RetrievalIndex>,
        pub fetcher: Arc<FakeFetcher>,
        pub embedder: Arc<FakeEmbedder>,
        pub generator: Arc<FakeGenerator>,
        pub metrics: Option<Arc<FakeMetrics>>,
        pub robots: Arc<FakeRobots>,
        pub parts: Collaborators,
        pub profile: AnalysisProfile,
    }

    impl Harness {
        pub(crate) async fn new(fetcher: FakeFetcher, metrics: Option<FakeMetrics>) -> Self {
            Self::with_robots(fetcher, metrics, FakeRobots::allow_all()).await
        }

        pub(crate) async fn with_robots(fetcher: FakeFetcher, metrics: Option<FakeMetrics>, robots: FakeRobots) -> Self {
            let cache = CacheDb::open_in_memory().await.unwrap();
            let embedder = Arc::new(FakeEmbedder::new(&[], vec![1.0, 0.0]));
            let generator = Arc::new(FakeGenerator::new("- Remove noindex (robots.noindex)"));
            let index = Arc::new(RetrievalIndex::new(embedder.clone(), generator.clone(), 64));
            let fetcher = Arc::new(fetcher);
            let metrics = metrics.map(Arc::new);
            let robots = Arc::new(robots);

            let parts = Collaborators {
                fetcher: fetcher.clone(),
                robots: robots.clone(),
                extractor: Arc::new(HtmlExtractor::new().unwrap()),
                metrics: metrics.clone().map(|m| m as Arc<dyn MetricsProvider>),
            };
            let auditor = Arc::new(Auditor::new(cache.clone(), index.clone(), parts.clone(), AuditSettings::default()));
            let profile = AnalysisProfile {
                generation_model: "gpt-5".into(),
                embedding_model: "text-embedding-3-small".into(),
                metrics_enabled: metrics.is_some(),
            };

            Self { auditor, cache, index, fetcher, embedder, generator, metrics, robots, parts, profile }
        }

        pub(crate) fn key(&self, url: &str) -> AuditKey {
            self.profile.derive_key(url).unwrap()
        }

        /// Run a first full audit and return the stored entry.
        pub(crate) async fn prime(&self, url: &str) -> CacheEntry {
            self.auditor.refresh(&self.key(url), url).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_noindex_page_full_run() {
        let h = Harness::new(FakeFetcher::new(modified(NOINDEX_PAGE, Some("\"v1\""))), None).await;
        let key = h.key("https://example.com/?utm_source=x");

        let entry = h.auditor.run(&key, "https://example.com/?utm_source=x", None).await.unwrap();
        let findings = &entry.report.findings;

        let title = findings.iter().find(|f| f.id == "title.missing").unwrap();
        assert_eq!((title.severity.as_str(), title.category.as_str()), ("error", "metadata"));
        let canonical = findings.iter().find(|f| f.id == "canonical.missing").unwrap();
        assert_eq!((canonical.severity.as_str(), canonical.category.as_str()), ("warn", "technical"));
        let noindex = findings.iter().find(|f| f.id == "robots.noindex").unwrap();
        assert_eq!((noindex.severity.as_str(), noindex.category.as_str(), noindex.weight), ("error", "technical", 10));
        assert!(entry.report.scores.overall < 100);

        assert_eq!(entry.url, "https://example.com/?utm_source=x");
        assert_eq!(entry.normalized_url, "https://example.com/");
        assert_eq!(entry.validators.etag.as_deref(), Some("\"v1\""));
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.cache.get_entry(&key.audit_hash).await.unwrap().unwrap(), entry);

        let hits = h.index.query_scoped("q", 8, &key.audit_hash).await.unwrap();
        assert_eq!(hits.len(), CHUNK_KINDS.len());
        for kind in CHUNK_KINDS {
            assert!(hits.iter().any(|hit| hit.id == format!("{}:{kind}", key.audit_hash)));
        }
    }

    #[tokio::test]
    async fn test_blocked_by_robots() {
        let robots = FakeRobots(Arc::new(RobotsPolicy { disallow: vec!["/private".into()], crawl_delay: None }));
        let h = Harness::with_robots(FakeFetcher::new(modified(GOOD_PAGE, None)), None, robots).await;
        let key = h.key("https://example.com/private/page");

        let result = h.auditor.run(&key, "https://example.com/private/page", None).await;

        assert!(matches!(result, Err(Error::Blocked(_))));
        assert_eq!(h.fetcher.call_count(), 0);
        assert!(h.cache.get_entry(&key.audit_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let h = Harness::new(FakeFetcher::new(modified(GOOD_PAGE, None)), None).await;
        h.fetcher.push(Step::Fail);
        let key = h.key("https://example.com/");

        let err = h.auditor.refresh(&key, "https://example.com/").await.unwrap_err();

        assert!(err.is_fetch_failure());
        assert!(h.cache.get_entry(&key.audit_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_not_modified_with_fresh_metrics_only_extends_page_expiry() {
        let h = Harness::new(FakeFetcher::new(modified(NOINDEX_PAGE, Some("\"v1\""))), None).await;
        let first = h.prime("https://example.com/").await;
        h.cache.expire_now(&first.audit_hash).await.unwrap();
        let stale = h.cache.get_entry(&first.audit_hash).await.unwrap().unwrap();
        let embed_calls = h.embedder.calls.load(Ordering::SeqCst);

        h.fetcher.push(Step::Page(not_modified()));
        let refreshed = h.auditor.refresh(&h.key("https://example.com/"), "https://example.com/").await.unwrap();

        assert_eq!(h.fetcher.last_validators().etag.as_deref(), Some("\"v1\""));
        assert!(refreshed.page_expires_at > Utc::now());
        let stored = h.cache.get_entry(&first.audit_hash).await.unwrap().unwrap();
        assert_eq!(stored, refreshed);
        assert_eq!(CacheEntry { page_expires_at: stale.page_expires_at, ..stored }, stale);
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), embed_calls);
    }

    #[tokio::test]
    async fn test_not_modified_with_fresh_metrics_skips_provider() {
        let metrics = FakeMetrics::new(Some(lighthouse(70, 80)));
        let h = Harness::new(FakeFetcher::new(modified(NOINDEX_PAGE, Some("\"v1\""))), Some(metrics)).await;
        let provider = h.metrics.clone().unwrap();
        let first = h.prime("https://example.com/").await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(first.metrics_fresh(Utc::now()));

        h.cache.expire_now(&first.audit_hash).await.unwrap();
        let stale = h.cache.get_entry(&first.audit_hash).await.unwrap().unwrap();
        let embed_calls = h.embedder.calls.load(Ordering::SeqCst);

        h.fetcher.push(Step::Page(not_modified()));
        let refreshed = h.auditor.refresh(&h.key("https://example.com/"), "https://example.com/").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(refreshed.is_fully_fresh(Utc::now(), true));
        let stored = h.cache.get_entry(&first.audit_hash).await.unwrap().unwrap();
        assert_eq!(stored, refreshed);
        assert_eq!(CacheEntry { page_expires_at: stale.page_expires_at, ..stored }, stale);
        assert_eq!(refreshed.report.metrics, Some(lighthouse(70, 80)));
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), embed_calls);
    }

    #[tokio::test]
    async fn test_not_modified_with_stale_metrics_recomputes_metrics_only() {
        let metrics = FakeMetrics::new(Some(lighthouse(40, 50)));
        let h = Harness::new(FakeFetcher::new(modified(NOINDEX_PAGE, Some("\"v1\""))), Some(metrics)).await;
        let first = h.prime("https://example.com/").await;

        let mut stale = first.clone();
        stale.metrics_expires_at = Utc::now() - TimeDelta::seconds(1);
        stale.page_expires_at = Utc::now() - TimeDelta::seconds(1);
        h.cache.put_entry(&stale).await.unwrap();

        h.metrics.as_ref().unwrap().set(Some(lighthouse(90, 100)));
        h.fetcher.push(Step::Page(not_modified()));
        let refreshed = h.auditor.refresh(&h.key("https://example.com/"), "https://example.com/").await.unwrap();

        assert_eq!(refreshed.report.findings, first.report.findings);
        assert_eq!(refreshed.report.suggestions, first.report.suggestions);
        assert_eq!(refreshed.report.excerpts, first.report.excerpts);
        assert_eq!(refreshed.report.scores.content, first.report.scores.content);
        assert_eq!(refreshed.report.scores.links, first.report.scores.links);
        assert_eq!(refreshed.report.scores.media, first.report.scores.media);
        assert_eq!(refreshed.validators, first.validators);

        assert_eq!(refreshed.report.metrics, Some(lighthouse(90, 100)));
        assert_eq!(refreshed.report.scores, score(&first.report.findings, Some(&lighthouse(90, 100))));
        assert!(refreshed.report.scores.technical > first.report.scores.technical);
        assert!(refreshed.metrics_fresh(Utc::now()));
        assert!(refreshed.page_fresh(Utc::now()));
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.cache.get_entry(&first.audit_hash).await.unwrap().unwrap(), refreshed);
    }

    #[tokio::test]
    async fn test_unchanged_fingerprint_reuses_suggestions() {
        let h = Harness::new(FakeFetcher::new(modified(NOINDEX_PAGE, None)), None).await;
        let first = h.prime("https://example.com/").await;
        assert_eq!(h.generator.calls(), 1);

        let second = h.prime("https://example.com/").await;
        assert_eq!(second.report.suggestions, first.report.suggestions);
        assert_eq!(h.generator.calls(), 1);

        h.fetcher.push(Step::Page(modified(GOOD_PAGE, None)));
        h.prime("https://example.com/").await;
        assert_eq!(h.generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_absent_metrics_keep_fresh_cached_metrics() {
        let metrics = FakeMetrics::new(Some(lighthouse(70, 80)));
        let h = Harness::new(FakeFetcher::new(modified(NOINDEX_PAGE, None)), Some(metrics)).await;
        let first = h.prime("https://example.com/").await;

        h.metrics.as_ref().unwrap().set(None);
        h.fetcher.push(Step::Page(modified(GOOD_PAGE, None)));
        let second = h.prime("https://example.com/").await;

        assert_eq!(second.report.metrics, first.report.metrics);
        assert_eq!(second.metrics_expires_at, first.metrics_expires_at);
        assert_eq!(second.report.scores, score(&second.report.findings, first.report.metrics.as_ref()));
    }

    #[test]
    fn test_report_chunks() {
        let entry = CacheEntry {
            audit_hash: "abc".into(),
            url: "https://example.com/".into(),
            normalized_url: "https://example.com/".into(),
            report: AuditReport {
                url: "https://example.com/".into(),
                final_url: "https://example.com/".into(),
                status: 200,
                findings: Vec::new(),
                metrics: None,
                scores: score(&[], None),
                suggestions: "- do things".into(),
                excerpts: Vec::new(),
            },
            status_code: 200,
            validators: Validators::default(),
            page_expires_at: Utc::now(),
            metrics_expires_at: Utc::now(),
            refreshed_at: Utc::now(),
        };

        let chunks = report_chunks(&entry);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["abc:summary", "abc:findings", "abc:suggestions"]);
        assert_eq!(chunks[0].text, "Overall score 100. PSI: skipped.");
        assert_eq!(chunks[1].text, "No findings.");
        assert_eq!(chunks[2].text, "- do things");
        assert_eq!(chunks[1].meta.audit_hash.as_deref(), Some("abc"));
    }

    #[test]
    fn test_settings_from_config() {
        let settings = AuditSettings::from_config(&AppConfig::default()).unwrap();
        assert_eq!(settings.page_ttl, TimeDelta::hours(6));
        assert_eq!(settings.metrics_ttl, TimeDelta::hours(48));
        assert!(settings.respect_robots);
    }
}
