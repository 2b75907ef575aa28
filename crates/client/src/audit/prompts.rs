//! Prompt text for suggestion generation and question answering.

use std::fmt::Write as _;

use crawliq_core::{Finding, PageAttributes, PerformanceMetrics};

use crate::index::Hit;

pub const SUGGESTIONS_SYSTEM: &str = "You are an SEO analyst. Use ONLY the supplied EVIDENCE (checks, performance metrics, DOM excerpts). \
Return actionable, prioritized suggestions. Avoid generic advice. Keep items crisp and testable. \
Format as bullet points with brief rationale. Include the related finding id in parentheses. \
If the page response is other than 200, say that no suggestions can be made.";

pub const CHAT_SYSTEM: &str = "You are a helpful SEO copilot. Answer using ONLY the supplied AUDIT and EXCERPTS. \
Cite findings with (id) and quote short evidence. If unknown, say so.";

/// The DOM excerpt stored with the report and quoted to the model.
pub fn dom_evidence(page: &PageAttributes) -> String {
    fn or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
        value.unwrap_or(fallback)
    }

    [
        format!("TITLE: {}", or(page.title.as_deref(), "(missing)")),
        format!("H1: {}", or(page.h1.as_deref(), "(missing)")),
        format!("META DESCRIPTION: {}", or(page.meta_description.as_deref(), "(missing)")),
        format!("CANONICAL: {}", or(page.canonical.as_deref(), "(missing)")),
        format!("ROBOTS: {}", or(page.meta_robots.as_deref(), "(none)")),
    ]
    .join("\n")
}

/// One line per finding, as quoted in the suggestions prompt.
fn finding_line(f: &Finding) -> String {
    let mut line = format!("- [{}] ({}) {}", f.id, f.severity.as_str(), f.message);
    if let Some(evidence) = &f.evidence {
        let _ = write!(line, " | evidence: {evidence}");
    }
    if let Some(hint) = &f.hint {
        let _ = write!(line, " | hint: {hint}");
    }
    let _ = write!(line, " (cat:{}, weight:{})", f.category.as_str(), f.weight);
    line
}

pub fn suggestions_prompt(findings: &[Finding], evidence: &str, metrics: Option<&PerformanceMetrics>) -> String {
    let findings = findings.iter().map(finding_line).collect::<Vec<_>>().join("\n");
    format!(
        "EVIDENCE:\nFindings:\n{findings}\n---\nDOM EXCERPTS:\n{evidence}\n---\nMETRICS:\n{}\nReturn 6-10 prioritized bullets.",
        PerformanceMetrics::summary_line(metrics)
    )
}

/// Numbered context block: `[i] (kind) text`, separated by `---`.
pub fn chat_context(hits: &[Hit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] ({}) {}", i + 1, hit.meta.kind, hit.text))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

pub fn chat_prompt(context: &str, question: &str) -> String {
    format!(
        "AUDIT:\n{context}\n\nQUESTION: {question}\n\nAnswer with citations like (summary) or ([finding.id])."
    )
}
