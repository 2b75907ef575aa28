//! Page attribute extraction using scraper.
//!
//! Provides a stable extraction abstraction that can be swapped later.
//!
//! ### Extracted Attributes
//! - Head metadata: title, description, robots, canonical, Open Graph, Twitter cards.
//! - Document structure: first H1, `<html lang>`, hreflang alternates, JSON-LD block count.
//! - Links (href + rel) and images (src + alt presence).
//! - Body text: word count and a whitespace-collapsed sample.
//!
//! ### Stable Abstraction
//! - Uses the `Extractor` trait for loose coupling between the auditor and the parsing engine.

pub mod links;

pub use links::{extract_links, is_nofollow};

use crawliq_core::{Error, HreflangAlternate, PageAttributes, PageImage};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Default length of the body text sample, in characters.
const DEFAULT_SAMPLE_CHARS: usize = 2000;

/// Elements whose text never counts as page copy.
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Stable extractor trait for page attributes.
pub trait Extractor: Send + Sync {
    /// Extract page attributes from HTML. Relative links resolve against `base_url`.
    fn extract(&self, html: &str, base_url: &Url) -> Result<PageAttributes, Error>;
}

/// Selectors compiled once per extractor.
struct Selectors {
    title: Selector,
    meta: Selector,
    link: Selector,
    h1: Selector,
    anchor: Selector,
    image: Selector,
    json_ld: Selector,
    html: Selector,
    body: Selector,
}

fn selector(css: &str) -> Result<Selector, Error> {
    Selector::parse(css).map_err(|e| Error::ExtractFailed(format!("invalid selector {css:?}: {e:?}")))
}

impl Selectors {
    fn compile() -> Result<Self, Error> {
        Ok(Self {
            title: selector("title")?,
            meta: selector("meta")?,
            link: selector("link[rel][href]")?,
            h1: selector("h1")?,
            anchor: selector("a[href]")?,
            image: selector("img[src]")?,
            json_ld: selector(r#"script[type="application/ld+json"]"#)?,
            html: selector("html")?,
            body: selector("body")?,
        })
    }
}

/// scraper-based extractor implementation.
pub struct HtmlExtractor {
    selectors: Selectors,
    sample_chars: usize,
}

impl HtmlExtractor {
    /// Create a new extractor.
    pub fn new() -> Result<Self, Error> {
        Ok(Self { selectors: Selectors::compile()?, sample_chars: DEFAULT_SAMPLE_CHARS })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(|v| v.to_string())
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    non_empty(Some(&text))
}

fn has_rel(element: ElementRef<'_>, token: &str) -> bool {
    element
        .value()
        .attr("rel")
        .is_some_and(|rel| rel.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
}

/// Concatenated text of the body, skipping script-like elements.
fn body_text(body: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in body.descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|el| NON_CONTENT_ELEMENTS.contains(&el.name()));
        if !hidden {
            text.push_str(fragment);
        }
    }
    text
}

impl Extractor for HtmlExtractor {
    fn extract(&self, html: &str, base_url: &Url) -> Result<PageAttributes, Error> {
        let document = Html::parse_document(html);
        let s = &self.selectors;
        let mut attrs = PageAttributes {
            title: document.select(&s.title).next().and_then(element_text),
            h1: document.select(&s.h1).next().and_then(element_text),
            links: extract_links(&document, &s.anchor, base_url),
            structured_data_blocks: document.select(&s.json_ld).count(),
            lang: document.select(&s.html).next().and_then(|el| non_empty(el.value().attr("lang"))),
            ..Default::default()
        };

        for meta in document.select(&s.meta) {
            let el = meta.value();
            let Some(content) = non_empty(el.attr("content")) else {
                continue;
            };
            let name = el.attr("name").unwrap_or_default().trim().to_ascii_lowercase();
            let property = el.attr("property").unwrap_or_default().trim().to_ascii_lowercase();

            match name.as_str() {
                "description" if attrs.meta_description.is_none() => attrs.meta_description = Some(content.clone()),
                "robots" if attrs.meta_robots.is_none() => attrs.meta_robots = Some(content.clone()),
                n if n.starts_with("twitter:") => {
                    attrs.twitter.insert(name.clone(), content.clone());
                }
                _ => {}
            }
            if property.starts_with("og:") {
                attrs.open_graph.insert(property, content);
            }
        }

        for link in document.select(&s.link) {
            let href = link.value().attr("href").unwrap_or_default().trim();
            if attrs.canonical.is_none() && has_rel(link, "canonical") && !href.is_empty() {
                attrs.canonical = Some(href.to_string());
            }
            if has_rel(link, "alternate")
                && let Some(lang) = non_empty(link.value().attr("hreflang"))
            {
                attrs.hreflang.push(HreflangAlternate { href: href.to_string(), lang });
            }
        }

        attrs.images = document
            .select(&s.image)
            .map(|img| PageImage {
                src: img.value().attr("src").unwrap_or_default().to_string(),
                has_alt: non_empty(img.value().attr("alt")).is_some(),
            })
            .collect();

        if let Some(body) = document.select(&s.body).next() {
            let text = body_text(body);
            let words: Vec<&str> = text.split_whitespace().collect();
            attrs.word_count = words.len();
            attrs.text_sample = words.join(" ").chars().take(self.sample_chars).collect();
        }

        Ok(attrs)
    }
}
