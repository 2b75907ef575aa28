//! Weighted category scores.
//!
//! Each category starts at 100 and loses `weight * penalty` per finding,
//! floored at 0. Lighthouse SEO and performance scores, when present, are
//! blended into metadata (60/40) and technical (70/30).

use crawliq_core::{Category, Finding, PerformanceMetrics, Scores, Severity};

fn penalty(severity: Severity) -> u32 {
    match severity {
        Severity::Error => 12,
        Severity::Warn => 6,
        Severity::Info => 2,
    }
}

fn blend(own: u32, external: u32, own_share: f64) -> u32 {
    (f64::from(own) * own_share + f64::from(external) * (1.0 - own_share)).round() as u32
}

/// Score findings, optionally blending in external metrics.
pub fn score(findings: &[Finding], metrics: Option<&PerformanceMetrics>) -> Scores {
    let mut s = Scores { technical: 100, content: 100, metadata: 100, links: 100, media: 100, overall: 0 };

    for f in findings {
        let slot = match f.category {
            Category::Technical => &mut s.technical,
            Category::Content => &mut s.content,
            Category::Metadata => &mut s.metadata,
            Category::Links => &mut s.links,
            Category::Media => &mut s.media,
        };
        *slot = slot.saturating_sub(f.weight.saturating_mul(penalty(f.severity)));
    }

    if let Some(lighthouse) = metrics.map(|m| &m.lighthouse) {
        if let Some(seo) = lighthouse.seo {
            s.metadata = blend(s.metadata, seo, 0.6);
        }
        if let Some(performance) = lighthouse.performance {
            s.technical = blend(s.technical, performance, 0.7);
        }
    }

    let total = s.technical + s.content + s.metadata + s.links + s.media;
    s.overall = (f64::from(total) / 5.0).round() as u32;
    s
}
