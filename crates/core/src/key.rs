//! Audit identity: "this page under this analysis configuration".

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::hash::compute_audit_hash;
use crate::url::normalize;

/// The configuration facets that change what an audit produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisProfile {
    pub generation_model: String,
    pub embedding_model: String,
    pub metrics_enabled: bool,
}

/// Normalized URL plus the audit hash derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditKey {
    pub normalized_url: String,
    pub audit_hash: String,
}

impl AnalysisProfile {
    /// Derive the audit key for a raw URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the URL cannot be parsed or uses a
    /// scheme other than http/https.
    pub fn derive_key(&self, raw_url: &str) -> Result<AuditKey, Error> {
        let normalized = normalize(raw_url)?;
        let normalized_url = normalized.to_string();
        let audit_hash =
            compute_audit_hash(&normalized_url, &self.generation_model, &self.embedding_model, self.metrics_enabled);
        Ok(AuditKey { normalized_url, audit_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> AnalysisProfile {
        AnalysisProfile {
            generation_model: "gpt-5".into(),
            embedding_model: "text-embedding-3-small".into(),
            metrics_enabled: false,
        }
    }

    #[test]
    fn test_derive_key_normalizes() {
        let key = profile().derive_key("https://EXAMPLE.com/a?utm_source=x#frag").unwrap();
        assert_eq!(key.normalized_url, "https://example.com/a");
    }

    #[test]
    fn test_equivalent_urls_share_hash() {
        let p = profile();
        let a = p.derive_key("https://example.com/a?k=1").unwrap();
        let b = p.derive_key("https://example.com/a?k=1&fbclid=abc#x").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_profile_changes_hash() {
        let base = profile();
        let url = "https://example.com/a";
        let key = base.derive_key(url).unwrap();

        let variants = [
            AnalysisProfile { generation_model: "gpt-4o".into(), ..base.clone() },
            AnalysisProfile { embedding_model: "text-embedding-3-large".into(), ..base.clone() },
            AnalysisProfile { metrics_enabled: true, ..base.clone() },
        ];
        for variant in variants {
            let other = variant.derive_key(url).unwrap();
            assert_eq!(other.normalized_url, key.normalized_url);
            assert_ne!(other.audit_hash, key.audit_hash);
        }
    }

    #[test]
    fn test_invalid_url_propagates() {
        let result = profile().derive_key("ftp://example.com/file");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
