//! audit_analyze tool implementation.
//!
//! Returns the cached audit when fresh, the stale audit while a refresh runs
//! in the background, or a freshly computed audit on a cache miss.

use chrono::SecondsFormat;
use crawliq_client::{Analysis, AppContext};
use crawliq_core::{AuditReport, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the audit_analyze tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditAnalyzeParams {
    /// The page to audit. The scheme defaults to https when omitted.
    pub url: String,
}

/// Output from the audit_analyze tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditAnalyzeOutput {
    /// Key for cache_get and scoped audit_ask calls.
    pub audit_hash: String,
    pub normalized_url: String,
    /// One of "fresh_cache", "stale_cache" (refresh queued) or "computed".
    pub served_from: String,
    /// RFC 3339 timestamp of the last computation or revalidation.
    pub refreshed_at: String,
    pub page_expires_at: String,
    pub metrics_expires_at: String,
    pub report: AuditReport,
}

impl From<Analysis> for AuditAnalyzeOutput {
    fn from(analysis: Analysis) -> Self {
        let entry = analysis.entry;
        let ts = |t: chrono::DateTime<chrono::Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);
        Self {
            audit_hash: entry.audit_hash,
            normalized_url: entry.normalized_url,
            served_from: analysis.served_from.as_str().to_string(),
            refreshed_at: ts(entry.refreshed_at),
            page_expires_at: ts(entry.page_expires_at),
            metrics_expires_at: ts(entry.metrics_expires_at),
            report: entry.report,
        }
    }
}

/// Implementation of the audit_analyze tool.
pub async fn analyze_impl(ctx: &AppContext, params: AuditAnalyzeParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url must not be empty".to_string()).into());
    }

    let analysis = ctx.analyze(&params.url).await?;
    tracing::info!(
        url = %analysis.entry.normalized_url,
        served_from = analysis.served_from.as_str(),
        overall = analysis.entry.report.scores.overall,
        "audit_analyze"
    );

    let output = AuditAnalyzeOutput::from(analysis);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize audit: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
