//! Link harvesting and URL fixing from HTML documents.

use scraper::{Html, Selector};
use url::Url;

use crawliq_core::PageLink;

/// Extract links from a parsed document, resolving relative URLs against the base URL.
///
/// Every `<a href>` is kept, duplicates included, together with its `rel`
/// attribute. An href that cannot be resolved is kept verbatim.
pub fn extract_links(document: &Html, selector: &Selector, base_url: &Url) -> Vec<PageLink> {
    document
        .select(selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            let resolved = base_url.join(href).map_or_else(|_| href.to_string(), |u| u.to_string());
            let rel = element
                .value()
                .attr("rel")
                .map(str::trim)
                .filter(|rel| !rel.is_empty())
                .map(|rel| rel.to_string());
            Some(PageLink { href: resolved, rel })
        })
        .collect()
}

/// True when the link's `rel` attribute carries the `nofollow` token.
pub fn is_nofollow(link: &PageLink) -> bool {
    link.rel
        .as_deref()
        .is_some_and(|rel| rel.split_ascii_whitespace().any(|token| token.eq_ignore_ascii_case("nofollow")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(html: &str, base: &str) -> Vec<PageLink> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("a[href]").unwrap();
        extract_links(&document, &selector, &Url::parse(base).unwrap())
    }

    #[test]
    fn test_extract_links_basic() {
        let found = links(r#"<html><body><a href="https://example.com">Example</a></body></html>"#, "https://example.com");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].href, "https://example.com/");
        assert_eq!(found[0].rel, None);
    }

    #[test]
    fn test_extract_links_relative() {
        let html = r#"
            <html>
                <body>
                    <a href="/about">About</a>
                    <a href="contact" rel="nofollow">Contact</a>
                </body>
            </html>
        "#;

        let found = links(html, "https://example.com/path/");

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].href, "https://example.com/about");
        assert_eq!(found[1].href, "https://example.com/path/contact");
        assert_eq!(found[1].rel.as_deref(), Some("nofollow"));
    }

    #[test]
    fn test_extract_links_keeps_duplicates() {
        let html = r#"<a href="https://example.com">First</a><a href="https://example.com">Second</a>"#;
        assert_eq!(links(html, "https://example.com").len(), 2);
    }

    #[test]
    fn test_is_nofollow_tokens() {
        let link = |rel: Option<&str>| PageLink { href: "https://example.com/".into(), rel: rel.map(String::from) };
        assert!(is_nofollow(&link(Some("nofollow"))));
        assert!(is_nofollow(&link(Some("noopener NoFollow"))));
        assert!(!is_nofollow(&link(Some("noopener"))));
        assert!(!is_nofollow(&link(None)));
    }
}
