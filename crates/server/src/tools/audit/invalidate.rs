//! audit_invalidate tool implementation.
//!
//! Expires a page's cached artifacts and queues a background recrawl.

use crawliq_client::AppContext;
use crawliq_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the audit_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditInvalidateParams {
    /// The page whose audit should be recomputed.
    pub url: String,
}

/// Output from the audit_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditInvalidateOutput {
    pub audit_hash: String,
    pub normalized_url: String,
    /// Always true: the recrawl runs in the background.
    pub queued: bool,
}

/// Implementation of the audit_invalidate tool.
pub async fn invalidate_impl(ctx: &AppContext, params: AuditInvalidateParams) -> Result<CallToolResult, McpError> {
    let key = ctx.invalidate(&params.url).await?;

    let output = AuditInvalidateOutput { audit_hash: key.audit_hash, normalized_url: key.normalized_url, queued: true };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
