//! URL normalization for stable audit keys.

/// Query parameters that only carry campaign or click attribution.
///
/// Any key starting with `utm_` is dropped as well.
pub const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "msclkid", "dclid", "yclid", "gbraid", "wbraid"];

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for crate::Error {
    fn from(err: UrlError) -> Self {
        crate::Error::InvalidInput(err.to_string())
    }
}

/// Normalize a URL string so equivalent page addresses share one key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Drop tracking parameters, keep every other query segment verbatim and in order
pub fn normalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| UrlError::InvalidUrl("missing host".into()))?;
    parsed
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    parsed.set_fragment(None);

    if let Some(query) = parsed.query() {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|segment| !segment.is_empty() && !is_tracking_segment(segment))
            .collect();
        let kept = kept.join("&");
        parsed.set_query(if kept.is_empty() { None } else { Some(&kept) });
    }

    Ok(parsed)
}

/// Origin of a URL (`scheme://host[:port]`), the unit of rate limiting.
pub fn origin_of(url: &url::Url) -> String {
    url.origin().ascii_serialization()
}

fn is_tracking_segment(segment: &str) -> bool {
    let key = segment.split_once('=').map_or(segment, |(k, _)| k);
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
