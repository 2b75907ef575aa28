//! Audit report document and the collaborator types it is built from.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured attributes extracted from a page's markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageAttributes {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_robots: Option<String>,
    pub canonical: Option<String>,
    pub h1: Option<String>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter: BTreeMap<String, String>,
    pub links: Vec<PageLink>,
    pub images: Vec<PageImage>,
    pub structured_data_blocks: usize,
    pub lang: Option<String>,
    pub hreflang: Vec<HreflangAlternate>,
    pub text_sample: String,
    pub word_count: usize,
}

/// An anchor with its resolved href and `rel` attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageLink {
    pub href: String,
    pub rel: Option<String>,
}

/// An image and whether it carries alt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageImage {
    pub src: String,
    pub has_alt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HreflangAlternate {
    pub href: String,
    pub lang: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Content,
    Technical,
    Links,
    Media,
    Metadata,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        }
    }
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Content => "content",
            Category::Technical => "technical",
            Category::Links => "links",
            Category::Media => "media",
            Category::Metadata => "metadata",
        }
    }
}

/// One checklist result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub id: String,
    pub severity: Severity,
    pub category: Category,
    pub weight: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Per-category scores (0-100) and their rounded mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Scores {
    pub technical: u32,
    pub content: u32,
    pub metadata: u32,
    pub links: u32,
    pub media: u32,
    pub overall: u32,
}

/// Lighthouse category scores, 0-100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LighthouseScores {
    pub performance: Option<u32>,
    pub accessibility: Option<u32>,
    pub seo: Option<u32>,
    pub best_practices: Option<u32>,
}

/// External performance metrics for a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceMetrics {
    /// Largest contentful paint, seconds.
    pub lcp: Option<f64>,
    /// Cumulative layout shift, unitless.
    pub cls: Option<f64>,
    /// Interaction to next paint, seconds.
    pub inp: Option<f64>,
    pub lighthouse: LighthouseScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Excerpt {
    pub id: String,
    pub text: String,
}

/// The cached analysis of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditReport {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub findings: Vec<Finding>,
    pub metrics: Option<PerformanceMetrics>,
    pub scores: Scores,
    pub suggestions: String,
    #[serde(default)]
    pub excerpts: Vec<Excerpt>,
}

impl PerformanceMetrics {
    /// One-line rendering used in prompts and the summary chunk.
    pub fn summary_line(metrics: Option<&PerformanceMetrics>) -> String {
        fn show<T: std::fmt::Display>(v: Option<T>) -> String {
            v.map_or_else(|| "NA".to_string(), |v| v.to_string())
        }

        match metrics {
            Some(m) => format!(
                "Lighthouse SEO: {}, Perf: {}, LCP: {}, CLS: {}, INP: {}",
                show(m.lighthouse.seo),
                show(m.lighthouse.performance),
                show(m.lcp),
                show(m.cls),
                show(m.inp)
            ),
            None => "PSI: skipped".to_string(),
        }
    }
}
