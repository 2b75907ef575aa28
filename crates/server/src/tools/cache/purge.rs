//! cache_purge tool implementation.
//!
//! Purges cached audits by domain or count.

use crawliq_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries whose URL contains this domain.
    #[serde(default)]
    pub domain: Option<String>,

    /// Keep only the newest N entries by refresh time.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.domain.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput("At least one of domain or max_entries must be specified".to_string()).into());
    }

    let mut deleted_total = 0u64;

    if let Some(domain) = params.domain {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(Error::InvalidInput("domain must not be empty".to_string()).into());
        }
        deleted_total += cache.purge_entries_by_domain(domain).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += cache.purge_oldest_entries(max_entries).await?;
    }

    tracing::info!(deleted = deleted_total, "cache purged");

    let output = CachePurgeOutput { deleted: deleted_total };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
