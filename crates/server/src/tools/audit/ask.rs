//! audit_ask tool implementation.
//!
//! Answers a question from indexed audit chunks, optionally scoped to one audit.

use crawliq_client::{AppContext, Citation};
use crawliq_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the audit_ask tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditAskParams {
    /// The question to answer.
    pub question: String,

    /// Restrict retrieval to this audit (from audit_analyze).
    #[serde(default)]
    pub audit_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditAskCitation {
    /// Node id, `<audit_hash>:<kind>`.
    pub id: String,
    pub kind: String,
    pub score: f32,
}

impl From<Citation> for AuditAskCitation {
    fn from(c: Citation) -> Self {
        Self { id: c.id, kind: c.kind, score: c.score }
    }
}

/// Output from the audit_ask tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditAskOutput {
    pub answer: String,
    pub citations: Vec<AuditAskCitation>,
}

/// Implementation of the audit_ask tool.
pub async fn ask_impl(ctx: &AppContext, params: AuditAskParams) -> Result<CallToolResult, McpError> {
    let audit_hash = params.audit_hash.as_deref().map(str::trim).filter(|h| !h.is_empty());
    let answer = ctx.ask(&params.question, audit_hash).await?;

    let output = AuditAskOutput {
        answer: answer.answer,
        citations: answer.citations.into_iter().map(AuditAskCitation::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize answer: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
