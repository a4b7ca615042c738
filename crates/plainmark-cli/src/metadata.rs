//! Page metadata fetching
//!
//! Fetches what `pmark add --fetch` stores about a page: title and
//! description, plus the site name, authors and preview image, which end up
//! as `site`, `author` and `image` fields on the bookmark.
//!
//! Each value is taken from the first source that has it. Social tags
//! (Open Graph, Twitter) come first, then plain HTML, then structured data
//! (JSON-LD, microdata, Dublin Core).

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Metadata extracted from a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub authors: Vec<String>,
    /// Absolute URL of a preview image
    pub image: Option<String>,
}

impl PageMetadata {
    /// Values stored as extra bookmark fields, keyed by field name
    pub fn extra_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(site) = &self.site_name {
            fields.push(("site", site.clone()));
        }
        if !self.authors.is_empty() {
            fields.push(("author", self.authors.join(", ")));
        }
        if let Some(image) = &self.image {
            fields.push(("image", image.clone()));
        }
        fields
    }
}

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

const JSON_LD: &str = r#"script[type="application/ld+json"]"#;

/// Fetch metadata from a URL
///
/// Returns empty metadata on failure.
pub async fn fetch_metadata(url: &str) -> PageMetadata {
    match fetch_metadata_inner(url).await {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("Metadata fetch for {} failed: {}", url, e);
            PageMetadata::default()
        }
    }
}

async fn fetch_metadata_inner(url: &str) -> Result<PageMetadata> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT))
        .user_agent(concat!("Mozilla/5.0 (compatible; plainmark/", env!("CARGO_PKG_VERSION"), ")"))
        .build()?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        debug!("{} returned {}", url, response.status());
        return Ok(PageMetadata::default());
    }

    // Relative image links resolve against where redirects ended up
    let page_url = response.url().clone();
    let html = response.text().await?;
    Ok(parse_metadata(&html, &page_url))
}

/// Parse metadata from HTML content
fn parse_metadata(html: &str, page_url: &Url) -> PageMetadata {
    let document = Html::parse_document(html);

    PageMetadata {
        title: extract_title(&document),
        description: extract_description(&document),
        site_name: extract_site_name(&document),
        authors: extract_authors(&document),
        image: extract_image(&document, page_url),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    extract_meta_content(document, &["og:title"])
        .or_else(|| extract_meta_content(document, &["twitter:title"]))
        .or_else(|| first_text(document, "head > title"))
        .or_else(|| json_ld_first(document, &["headline", "name", "alternativeHeadline"]))
        .or_else(|| itemprop(document, "headline"))
        .or_else(|| itemprop(document, "name"))
        .or_else(|| extract_meta_content(document, &["dc.title", "dcterms.title"]))
}

fn extract_description(document: &Html) -> Option<String> {
    extract_meta_content(document, &["og:description"])
        .or_else(|| extract_meta_content(document, &["twitter:description"]))
        .or_else(|| extract_meta_content(document, &["description"]))
        .or_else(|| json_ld_first(document, &["description", "abstract"]))
        .or_else(|| itemprop(document, "description"))
        .or_else(|| {
            extract_meta_content(
                document,
                &["dc.description", "dcterms.description", "dcterms.abstract"],
            )
        })
}

fn extract_site_name(document: &Html) -> Option<String> {
    extract_meta_content(document, &["og:site_name"])
        .or_else(|| json_ld_site_name(document))
        .or_else(|| extract_meta_content(document, &["application-name"]))
}

fn extract_authors(document: &Html) -> Vec<String> {
    authors(meta_values(document, &["author"]))
        .or_else(|| authors(meta_values(document, &["article:author"])))
        .or_else(|| authors(json_ld_authors(document)))
        .or_else(|| authors(meta_values(document, &["dc.creator", "dcterms.creator"])))
        .or_else(|| {
            authors(
                meta_values(document, &["twitter:creator"])
                    .into_iter()
                    .map(|handle| handle.trim_start_matches('@').to_string())
                    .collect(),
            )
        })
        .unwrap_or_default()
}

/// First usable http(s) image link, made absolute
fn extract_image(document: &Html, page_url: &Url) -> Option<String> {
    meta_values(
        document,
        &[
            "og:image:secure_url",
            "og:image:url",
            "og:image",
            "twitter:image",
            "twitter:image:src",
        ],
    )
    .into_iter()
    .filter_map(|link| page_url.join(&link).ok())
    .find(|link| matches!(link.scheme(), "http" | "https"))
    .map(String::from)
}

/// Content of the first meta tag whose property or name is one of `keys`
///
/// Keys are matched case-insensitively, in the order they are given.
fn extract_meta_content(document: &Html, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| meta_values(document, &[*key]).into_iter().next())
}

/// Contents of all meta tags whose property or name is one of `keys`
///
/// Results follow the order of `keys`, then document order.
fn meta_values(document: &Html, keys: &[&str]) -> Vec<String> {
    let Ok(selector) = Selector::parse("meta[content]") else {
        return Vec::new();
    };
    let metas: Vec<ElementRef<'_>> = document.select(&selector).collect();

    keys.iter()
        .flat_map(|key| {
            metas.iter().filter(move |meta| {
                ["property", "name"].iter().any(|attr| {
                    meta.value()
                        .attr(attr)
                        .is_some_and(|value| value.trim().eq_ignore_ascii_case(key))
                })
            })
        })
        .filter_map(|meta| meta.value().attr("content"))
        .map(single_line)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Text of the first element matching `css`
fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .map(|el| single_line(&el.text().collect::<String>()))
        .find(|s| !s.is_empty())
}

/// Microdata property, from its `content` attribute or its text
fn itemprop(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"[itemprop="{}"]"#, name)).ok()?;
    document.select(&selector).find_map(|el| {
        let value = match el.value().attr("content") {
            Some(content) => single_line(content),
            None => single_line(&el.text().collect::<String>()),
        };
        (!value.is_empty()).then_some(value)
    })
}

/// Every JSON-LD block on the page that parses
fn json_ld_values(document: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse(JSON_LD) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|script| {
            let raw = script.text().collect::<String>();
            match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Skipping unreadable JSON-LD block: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// First string found under the earliest of `keys` that any block has
fn json_ld_first(document: &Html, keys: &[&str]) -> Option<String> {
    let values = json_ld_values(document);
    keys.iter().find_map(|key| {
        let mut found = Vec::new();
        for value in &values {
            collect_strings(value, key, &mut found);
        }
        found.into_iter().find(|s| !s.is_empty())
    })
}

fn collect_strings(value: &Value, key: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get(key) {
                out.push(single_line(s));
            }
            for child in map.values() {
                collect_strings(child, key, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, key, out);
            }
        }
        _ => {}
    }
}

/// Name of a `WebSite` node, or of the publisher
fn json_ld_site_name(document: &Html) -> Option<String> {
    let mut found = Vec::new();
    for value in json_ld_values(document) {
        collect_site_names(&value, &mut found);
    }
    found.into_iter().find(|s| !s.is_empty())
}

fn collect_site_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            let is_website = map
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.contains("WebSite"));
            if is_website {
                if let Some(name) = map.get("name").and_then(Value::as_str) {
                    out.push(single_line(name));
                }
            }
            if let Some(name) = map
                .get("publisher")
                .and_then(|publisher| publisher.get("name"))
                .and_then(Value::as_str)
            {
                out.push(single_line(name));
            }
            for child in map.values() {
                collect_site_names(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_site_names(item, out);
            }
        }
        _ => {}
    }
}

/// Names under `author` or `creator` anywhere in the JSON-LD
fn json_ld_authors(document: &Html) -> Vec<String> {
    let mut found = Vec::new();
    for value in json_ld_values(document) {
        collect_authors(&value, &mut found);
    }
    found
}

fn collect_authors(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for key in ["author", "creator"] {
                if let Some(node) = map.get(key) {
                    author_names(node, out);
                }
            }
            for child in map.values() {
                collect_authors(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_authors(item, out);
            }
        }
        _ => {}
    }
}

/// An author is a plain name, a `Person` object, or a list of either
fn author_names(node: &Value, out: &mut Vec<String>) {
    match node {
        // Bare strings are sometimes profile links rather than names
        Value::String(s) if !is_web_link(s) => out.push(single_line(s)),
        Value::Object(map) => {
            if let Some(name) = map.get("name").and_then(Value::as_str) {
                out.push(single_line(name));
                return;
            }
            let parts: Vec<&str> = ["givenName", "familyName"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if !parts.is_empty() {
                out.push(parts.join(" "));
            }
        }
        Value::Array(items) => {
            for item in items {
                author_names(item, out);
            }
        }
        _ => {}
    }
}

fn is_web_link(s: &str) -> bool {
    Url::parse(s.trim()).is_ok_and(|link| matches!(link.scheme(), "http" | "https"))
}

/// Distinct non-empty names in first-seen order, or `None` if there are none
fn authors(names: Vec<String>) -> Option<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Collapse runs of whitespace, including line breaks, to single spaces
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/posts/1").unwrap()
    }

    fn parse(html: &str) -> PageMetadata {
        parse_metadata(html, &page_url())
    }

    #[test]
    fn test_parse_metadata_basic() {
        let html = r#"
            <!DOCTYPE html>
            <html>
            <head>
                <title>Test Page</title>
                <meta name="description" content="A test description">
            </head>
            <body></body>
            </html>
        "#;

        let metadata = parse(html);
        assert_eq!(metadata.title, Some("Test Page".to_string()));
        assert_eq!(metadata.description, Some("A test description".to_string()));
    }

    #[test]
    fn test_parse_metadata_opengraph() {
        let html = r#"
            <!DOCTYPE html>
            <html>
            <head>
                <title>Fallback Title</title>
                <meta property="og:title" content="OG Title">
                <meta property="og:description" content="OG Description">
                <meta property="og:site_name" content="Example Site">
                <meta property="og:image" content="/img/cover.png">
            </head>
            <body></body>
            </html>
        "#;

        let metadata = parse(html);
        // OG takes precedence
        assert_eq!(metadata.title, Some("OG Title".to_string()));
        assert_eq!(metadata.description, Some("OG Description".to_string()));
        assert_eq!(metadata.site_name, Some("Example Site".to_string()));
        assert_eq!(
            metadata.image,
            Some("https://example.com/img/cover.png".to_string())
        );
    }

    #[test]
    fn test_parse_metadata_twitter() {
        let html = r#"
            <html><head>
                <meta name="twitter:title" content="Tweet Title">
                <meta name="twitter:description" content="Tweet text">
                <meta name="twitter:creator" content="@ann">
            </head></html>
        "#;

        let metadata = parse(html);
        assert_eq!(metadata.title, Some("Tweet Title".to_string()));
        assert_eq!(metadata.description, Some("Tweet text".to_string()));
        assert_eq!(metadata.authors, vec!["ann".to_string()]);
    }

    #[test]
    fn test_json_ld_fallbacks() {
        let html = r#"
            <html><head>
                <script type="application/ld+json">
                {
                    "@context": "https://schema.org",
                    "@graph": [
                        {"@type": "WebSite", "name": "Example Blog"},
                        {
                            "@type": "BlogPosting",
                            "headline": "Structured\n Headline",
                            "description": "From JSON-LD",
                            "author": [
                                {"@type": "Person", "name": "Ann Smith"},
                                {"@type": "Person", "givenName": "Bob", "familyName": "Jones"},
                                "https://example.com/about"
                            ]
                        }
                    ]
                }
                </script>
                <script type="application/ld+json">{ not json</script>
            </head></html>
        "#;

        let metadata = parse(html);
        // A headline anywhere beats the site's name
        assert_eq!(metadata.title, Some("Structured Headline".to_string()));
        assert_eq!(metadata.description, Some("From JSON-LD".to_string()));
        assert_eq!(metadata.site_name, Some("Example Blog".to_string()));
        assert_eq!(
            metadata.authors,
            vec!["Ann Smith".to_string(), "Bob Jones".to_string()]
        );
    }

    #[test]
    fn test_dublin_core_and_microdata() {
        let html = r#"
            <html><head>
                <meta name="DC.title" content="Dublin Title">
                <meta name="dc.description" content="Dublin description">
                <meta name="DC.creator" content="Carol">
                <meta name="DC.creator" content="Dan">
            </head><body></body></html>
        "#;
        let metadata = parse(html);
        assert_eq!(metadata.title, Some("Dublin Title".to_string()));
        assert_eq!(metadata.description, Some("Dublin description".to_string()));
        assert_eq!(metadata.authors, vec!["Carol".to_string(), "Dan".to_string()]);

        let html = r#"
            <html><head><meta name="dc.title" content="Dublin Title"></head>
            <body><article>
                <h1 itemprop="headline"> Microdata   Headline </h1>
                <p itemprop="description">About things</p>
            </article></body></html>
        "#;
        let metadata = parse(html);
        assert_eq!(metadata.title, Some("Microdata Headline".to_string()));
        assert_eq!(metadata.description, Some("About things".to_string()));
    }

    #[test]
    fn test_meta_author_wins_over_structured_data() {
        let html = r#"
            <html><head>
                <meta name="author" content="Ann">
                <meta name="author" content="Ann">
                <meta property="article:author" content="Someone Else">
                <script type="application/ld+json">{"author": "Bob"}</script>
            </head></html>
        "#;
        assert_eq!(parse(html).authors, vec!["Ann".to_string()]);
    }

    #[test]
    fn test_image_must_be_http() {
        let html = r#"
            <html><head>
                <meta property="og:image" content="data:image/png;base64,AAAA">
                <meta name="twitter:image" content="//cdn.example.com/t.png">
            </head></html>
        "#;
        assert_eq!(
            parse(html).image,
            Some("https://cdn.example.com/t.png".to_string())
        );
    }

    #[test]
    fn test_extra_fields() {
        let metadata = PageMetadata {
            site_name: Some("Example".to_string()),
            authors: vec!["Ann".to_string(), "Bob".to_string()],
            image: Some("https://example.com/a.png".to_string()),
            ..PageMetadata::default()
        };
        assert_eq!(
            metadata.extra_fields(),
            vec![
                ("site", "Example".to_string()),
                ("author", "Ann, Bob".to_string()),
                ("image", "https://example.com/a.png".to_string()),
            ]
        );
        assert!(PageMetadata::default().extra_fields().is_empty());
    }

    #[test]
    fn test_multiline_title_is_flattened() {
        let html = "<html><head><title>\n  Split\n  Title\n</title></head></html>";
        let metadata = parse(html);
        assert_eq!(metadata.title, Some("Split Title".to_string()));
    }

    #[test]
    fn test_parse_metadata_empty() {
        let html = "<html><head></head><body></body></html>";
        assert_eq!(parse(html), PageMetadata::default());
    }
}
