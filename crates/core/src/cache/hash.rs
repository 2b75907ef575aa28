//! Audit cache key generation.

use sha2::{Digest, Sha256};

/// Compute the audit hash for a normalized URL under an analysis configuration.
///
/// The hashed string is `url|generation_model|embedding_model|metrics:on|off`,
/// so changing any model or toggling the metrics provider yields a new key.
pub fn compute_audit_hash(
    normalized_url: &str, generation_model: &str, embedding_model: &str, metrics_enabled: bool,
) -> String {
    let composite = format!(
        "{normalized_url}|{generation_model}|{embedding_model}|metrics:{}",
        if metrics_enabled { "on" } else { "off" }
    );
    sha256_hex(composite.as_bytes())
}

/// Hex-encoded SHA-256 of arbitrary bytes (content fingerprints).
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_audit_hash("https://example.com/", "gpt-5", "text-embedding-3-small", false);
        let hash2 = compute_audit_hash("https://example.com/", "gpt-5", "text-embedding-3-small", false);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_generation_model() {
        let a = compute_audit_hash("https://example.com/", "gpt-5", "emb", false);
        let b = compute_audit_hash("https://example.com/", "gpt-4o", "emb", false);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_different_embedding_model() {
        let a = compute_audit_hash("https://example.com/", "gpt-5", "text-embedding-3-small", false);
        let b = compute_audit_hash("https://example.com/", "gpt-5", "text-embedding-3-large", false);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_different_metrics_flag() {
        let off = compute_audit_hash("https://example.com/", "gpt-5", "emb", false);
        let on = compute_audit_hash("https://example.com/", "gpt-5", "emb", true);
        assert_ne!(off, on);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_audit_hash("https://example.com/", "gpt-5", "emb", true);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
