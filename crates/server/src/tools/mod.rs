//! MCP tool implementations.
//!
//! This module contains all tools exposed by the crawliq server.

pub mod audit;
pub mod cache;

pub use audit::{AuditAnalyzeParams, AuditAskParams, AuditInvalidateParams};
pub use cache::{CacheGetParams, CachePurgeParams};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};
    use crawliq_client::{
        AppContext, Collaborators, FetchClient, FetchConfig, HtmlExtractor, OpenAiClient, OpenAiConfig, RetrievalIndex,
        RobotsCache,
    };
    use crawliq_core::{AppConfig, AuditReport, CacheDb, CacheEntry, Scores, Validators};
    use rmcp::model::CallToolResult;

    /// A context with real clients and no API keys. Nothing in it may reach a
    /// provider without failing on the missing key first.
    pub(crate) async fn offline_context() -> AppContext {
        let config = AppConfig { respect_robots: false, ..Default::default() };
        let cache = CacheDb::open_in_memory().await.unwrap();
        let llm = Arc::new(OpenAiClient::new(OpenAiConfig::default()).unwrap());
        let index = Arc::new(RetrievalIndex::new(llm.clone(), llm, 16));
        let parts = Collaborators {
            fetcher: Arc::new(FetchClient::new(FetchConfig::default()).unwrap()),
            robots: Arc::new(RobotsCache::new("crawliq-test".into(), config.timeout()).unwrap()),
            extractor: Arc::new(HtmlExtractor::new().unwrap()),
            metrics: None,
        };
        AppContext::new(&config, cache, index, parts).unwrap()
    }

    pub(crate) fn sample_entry(url: &str) -> CacheEntry {
        let key = AppConfig::default().analysis_profile().derive_key(url).unwrap();
        let now = Utc::now();
        CacheEntry {
            audit_hash: key.audit_hash,
            url: url.to_string(),
            normalized_url: key.normalized_url,
            report: AuditReport {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                findings: Vec::new(),
                metrics: None,
                scores: Scores { technical: 100, content: 100, metadata: 100, links: 100, media: 100, overall: 100 },
                suggestions: "- Nothing to fix.".to_string(),
                excerpts: Vec::new(),
            },
            status_code: 200,
            validators: Validators { etag: Some("\"v1\"".into()), ..Default::default() },
            page_expires_at: now + TimeDelta::hours(6),
            metrics_expires_at: now + TimeDelta::hours(48),
            refreshed_at: now,
        }
    }

    /// The text of a tool result's first content block.
    pub(crate) fn text_of(result: &CallToolResult) -> String {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        content.get("text").and_then(|v| v.as_str()).unwrap().to_string()
    }
}
