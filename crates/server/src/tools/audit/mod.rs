//! Audit MCP tools.
//!
//! Analyze a page (served with stale-while-revalidate), force a recrawl, and
//! ask questions against indexed audits.

pub mod analyze;
pub mod ask;
pub mod invalidate;

pub use analyze::{AuditAnalyzeParams, analyze_impl};
pub use ask::{AuditAskParams, ask_impl};
pub use invalidate::{AuditInvalidateParams, invalidate_impl};
