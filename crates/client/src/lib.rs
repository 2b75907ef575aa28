//! Client code for crawliq.
//!
//! This crate provides the HTTP fetch pipeline, page extraction, the audit
//! orchestrator with its recrawl queue, the retrieval index and the external
//! provider clients (PageSpeed Insights, OpenAI-compatible LLM APIs).

pub mod audit;
pub mod context;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod llm;
pub mod pagespeed;

pub use audit::{AuditSettings, Auditor, Collaborators, OriginGate, RecrawlQueue};
pub use context::{Analysis, Answer, AppContext, Citation, Served};
pub use extract::{Extractor, HtmlExtractor, extract_links};
pub use fetch::{FetchClient, FetchConfig, FetchOutcome, FetchedPage, PageFetcher, RobotsCache, RobotsPolicy};
pub use index::{Chunk, Hit, NodeMeta, RetrievalIndex};
pub use llm::{Embedder, Generator, OpenAiClient, OpenAiConfig};
pub use pagespeed::{MetricsProvider, PageSpeedClient, PageSpeedConfig};
