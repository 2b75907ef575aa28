//! PageSpeed Insights v5 response types and normalization.

use std::collections::HashMap;

use serde::Deserialize;

use crawliq_core::{LighthouseScores, PerformanceMetrics};

/// Raw response from the `runPagespeed` endpoint (only the fields we read).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedApiResponse {
    #[serde(default)]
    pub loading_experience: Option<LoadingExperience>,
    #[serde(default)]
    pub lighthouse_result: Option<LighthouseResult>,
}

/// Field data (Chrome UX Report) for the page.
#[derive(Debug, Deserialize)]
pub struct LoadingExperience {
    #[serde(default)]
    pub metrics: HashMap<String, FieldMetric>,
}

#[derive(Debug, Deserialize)]
pub struct FieldMetric {
    #[serde(default)]
    pub percentile: Option<f64>,
}

/// Lab data: Lighthouse category scores in 0..=1.
#[derive(Debug, Deserialize)]
pub struct LighthouseResult {
    #[serde(default)]
    pub categories: HashMap<String, LighthouseCategory>,
}

#[derive(Debug, Deserialize)]
pub struct LighthouseCategory {
    #[serde(default)]
    pub score: Option<f64>,
}

impl PageSpeedApiResponse {
    fn field_percentile(&self, key: &str) -> Option<f64> {
        self.loading_experience.as_ref()?.metrics.get(key)?.percentile
    }

    fn category_score(&self, key: &str) -> Option<u32> {
        let score = self.lighthouse_result.as_ref()?.categories.get(key)?.score?;
        Some((score * 100.0).round().clamp(0.0, 100.0) as u32)
    }
}

impl From<PageSpeedApiResponse> for PerformanceMetrics {
    /// Field timings arrive in milliseconds and CLS scaled by 100; normalize to seconds and unitless.
    fn from(raw: PageSpeedApiResponse) -> Self {
        PerformanceMetrics {
            lcp: raw.field_percentile("LARGEST_CONTENTFUL_PAINT_MS").map(|ms| ms / 1000.0),
            cls: raw.field_percentile("CUMULATIVE_LAYOUT_SHIFT_SCORE").map(|v| v / 100.0),
            inp: raw.field_percentile("INTERACTION_TO_NEXT_PAINT").map(|ms| ms / 1000.0),
            lighthouse: LighthouseScores {
                performance: raw.category_score("performance"),
                accessibility: raw.category_score("accessibility"),
                seo: raw.category_score("seo"),
                best_practices: raw.category_score("best-practices"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "https://example.com/",
        "loadingExperience": {
            "metrics": {
                "LARGEST_CONTENTFUL_PAINT_MS": { "percentile": 2500, "category": "AVERAGE" },
                "CUMULATIVE_LAYOUT_SHIFT_SCORE": { "percentile": 5, "category": "FAST" },
                "INTERACTION_TO_NEXT_PAINT": { "percentile": 180, "category": "FAST" }
            }
        },
        "lighthouseResult": {
            "categories": {
                "performance": { "score": 0.874 },
                "seo": { "score": 0.92 },
                "accessibility": { "score": null }
            }
        }
    }"#;

    #[test]
    fn test_normalize_response() {
        let raw: PageSpeedApiResponse = serde_json::from_str(SAMPLE).unwrap();
        let metrics = PerformanceMetrics::from(raw);

        assert_eq!(metrics.lcp, Some(2.5));
        assert_eq!(metrics.cls, Some(0.05));
        assert_eq!(metrics.inp, Some(0.18));
        assert_eq!(metrics.lighthouse.performance, Some(87));
        assert_eq!(metrics.lighthouse.seo, Some(92));
        assert_eq!(metrics.lighthouse.accessibility, None);
        assert_eq!(metrics.lighthouse.best_practices, None);
    }

    #[test]
    fn test_normalize_empty_response() {
        let raw: PageSpeedApiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(PerformanceMetrics::from(raw), PerformanceMetrics::default());
    }
}
