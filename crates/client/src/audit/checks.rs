//! Rule checklist over extracted page attributes.

use crawliq_core::{Category, Finding, PageAttributes, Severity};

use crate::extract::is_nofollow;

/// Pages below this many words are flagged as thin content.
const THIN_CONTENT_WORDS: usize = 250;

const TITLE_MIN_CHARS: usize = 15;
const TITLE_MAX_CHARS: usize = 65;

fn finding(id: &str, severity: Severity, category: Category, weight: u32, message: String, hint: &str) -> Finding {
    Finding { id: id.to_string(), severity, category, weight, message, evidence: None, hint: Some(hint.to_string()) }
}

/// Run every rule; findings come back in rule order.
pub fn run_checks(page: &PageAttributes) -> Vec<Finding> {
    let mut out = Vec::new();

    match page.title.as_deref() {
        None => out.push(finding(
            "title.missing",
            Severity::Error,
            Category::Metadata,
            6,
            "Missing <title>.".into(),
            "Add a concise, keyword-focused title (40-60 chars).",
        )),
        Some(title) => {
            let len = title.chars().count();
            if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
                out.push(Finding {
                    evidence: Some(title.to_string()),
                    ..finding(
                        "title.length",
                        Severity::Warn,
                        Category::Metadata,
                        2,
                        format!("Suboptimal title length ({len})."),
                        "Aim for about 50-60 chars.",
                    )
                });
            }
        }
    }

    if page.meta_description.is_none() {
        out.push(finding(
            "desc.missing",
            Severity::Warn,
            Category::Metadata,
            3,
            "Missing meta description.".into(),
            "Add a compelling summary of about 150-160 chars.",
        ));
    }

    if page.h1.is_none() {
        out.push(finding(
            "h1.missing",
            Severity::Error,
            Category::Content,
            5,
            "Missing H1.".into(),
            "Include a single descriptive H1.",
        ));
    }

    if page.canonical.is_none() {
        out.push(finding(
            "canonical.missing",
            Severity::Warn,
            Category::Technical,
            2,
            "Missing canonical link.".into(),
            "Add <link rel='canonical'>.",
        ));
    }

    if let Some(robots) = page.meta_robots.as_deref()
        && robots.to_ascii_lowercase().contains("noindex")
    {
        out.push(Finding {
            evidence: Some(robots.to_string()),
            ..finding(
                "robots.noindex",
                Severity::Error,
                Category::Technical,
                10,
                "Page is noindex.".into(),
                "Remove noindex to rank.",
            )
        });
    }

    let missing_alt = page.images.iter().filter(|img| !img.has_alt).count();
    if missing_alt > 0 {
        out.push(finding(
            "img.alt",
            Severity::Warn,
            Category::Media,
            2,
            format!("{missing_alt} images missing alt."),
            "Provide descriptive alts.",
        ));
    }

    if !page.open_graph.contains_key("og:title") || !page.open_graph.contains_key("og:description") {
        out.push(finding(
            "og.missing",
            Severity::Info,
            Category::Metadata,
            1,
            "Missing Open Graph tags.".into(),
            "Add og:title, og:description, og:image.",
        ));
    }

    if page.structured_data_blocks == 0 {
        out.push(finding(
            "schema.none",
            Severity::Info,
            Category::Technical,
            1,
            "No JSON-LD structured data found.".into(),
            "Add relevant schema.org markup.",
        ));
    }

    if !page.hreflang.is_empty() && page.lang.is_none() {
        out.push(finding(
            "hreflang.lang",
            Severity::Warn,
            Category::Technical,
            2,
            "Hreflang present but <html lang> missing.".into(),
            "Set <html lang='...'>.",
        ));
    }

    if page.word_count < THIN_CONTENT_WORDS {
        out.push(finding(
            "content.thin",
            Severity::Warn,
            Category::Content,
            3,
            format!("Low word count ({}).", page.word_count),
            "Expand with helpful information.",
        ));
    }

    if !page.links.is_empty() && page.links.iter().all(is_nofollow) {
        out.push(finding(
            "links.allNofollow",
            Severity::Info,
            Category::Links,
            1,
            "All links are nofollow.".into(),
            "Internal links should usually be followed.",
        ));
    }

    out
}
