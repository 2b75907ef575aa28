//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::audit::{
    AuditAnalyzeParams, AuditAskParams, AuditInvalidateParams, analyze_impl, ask_impl, invalidate_impl,
};
use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crawliq_client::AppContext;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for crawliq.
#[derive(Clone)]
pub struct CrawliqServer {
    ctx: Arc<AppContext>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CrawliqServer {
    /// Create a new server handler around a shared application context.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Audit a web page for SEO issues. Returns findings, category scores, performance metrics and suggestions. Cached audits are served immediately; stale ones are refreshed in the background."
    )]
    async fn audit_analyze(&self, params: Parameters<AuditAnalyzeParams>) -> Result<CallToolResult, McpError> {
        analyze_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Expire a page's cached audit and queue a background recrawl. Returns the audit hash.")]
    async fn audit_invalidate(&self, params: Parameters<AuditInvalidateParams>) -> Result<CallToolResult, McpError> {
        invalidate_impl(&self.ctx, params.0).await
    }

    #[tool(
        description = "Ask a question about audited pages. Pass audit_hash to restrict the answer to one audit. Returns the answer with cited chunks."
    )]
    async fn audit_ask(&self, params: Parameters<AuditAskParams>) -> Result<CallToolResult, McpError> {
        ask_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Retrieve a cached audit entry by its audit hash.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.ctx.cache(), params.0).await
    }

    #[tool(description = "Purge cached audits by domain and/or keep only the newest N entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.ctx.cache(), params.0).await
    }
}

impl ServerHandler for CrawliqServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "crawliq".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
