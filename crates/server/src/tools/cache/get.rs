//! cache_get tool implementation.
//!
//! Retrieves a cached audit entry by hash.

use crawliq_core::{CacheDb, CacheEntry, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The audit hash of the cached entry to retrieve.
    pub hash: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheGetOutput {
    /// The cached entry, expiries and validators included.
    pub entry: CacheEntry,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let entry = cache
        .get_entry(&params.hash)
        .await?
        .ok_or_else(|| Error::CacheMiss(params.hash.clone()))?;

    let output = CacheGetOutput { entry };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{sample_entry, text_of};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { hash: "nonexistent".to_string() };

        let err = get_impl(&cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let entry = sample_entry("https://example.com/");
        cache.put_entry(&entry).await.unwrap();

        let result = get_impl(&cache, CacheGetParams { hash: entry.audit_hash.clone() }).await.unwrap();
        let output: CacheGetOutput = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(output.entry, entry);
    }
}
