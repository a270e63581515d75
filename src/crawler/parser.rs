//! HTML parsing and link extraction
//!
//! This module turns fetched markup into a [`ParsedPage`] and runs the
//! extraction passes over it:
//! - Link pass: same-origin, not-yet-visited, non-PDF anchors
//! - Email pass: every [`EmailStrategy`](crate::email::EmailStrategy)

use crate::crawler::frontier::VisitedSet;
use crate::email::{harvest_emails, EmailSet, NO_TITLE};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A fetched page parsed into a document tree
///
/// The raw markup is kept next to the tree because obfuscation markers are
/// matched against the markup text itself.
#[derive(Debug)]
pub struct ParsedPage {
    /// Address the page was served from (used as the base for relative links)
    pub url: String,

    /// Raw markup as fetched
    pub markup: String,

    /// Parsed document tree
    pub document: Html,

    /// Trimmed `<title>` text, or "No Title"
    pub title: String,
}

impl ParsedPage {
    /// Parses `markup` served from `url`
    ///
    /// # Example
    ///
    /// ```
    /// use ripple_harvest::crawler::ParsedPage;
    ///
    /// let page = ParsedPage::parse(
    ///     "https://example.com/",
    ///     "<html><head><title> Home </title></head></html>",
    /// );
    /// assert_eq!(page.title, "Home");
    /// ```
    pub fn parse(url: impl Into<String>, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let document = Html::parse_document(&markup);
        let title = extract_title(&document).unwrap_or_else(|| NO_TITLE.to_string());

        Self {
            url: url.into(),
            markup,
            document,
            title,
        }
    }
}

/// Everything one page contributes to a crawl
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// New in-scope links, in document order, without duplicates
    pub links: Vec<String>,

    /// Email records found on the page
    pub emails: EmailSet,
}

/// Runs the link pass and the email pass over one page
///
/// # Arguments
///
/// * `page` - The parsed page
/// * `origin` - Prefix every followed link must start with
/// * `visited` - Addresses the caller has already processed
pub fn extract(page: &ParsedPage, origin: &str, visited: &VisitedSet) -> Extraction {
    Extraction {
        links: extract_links(page, origin, visited),
        emails: harvest_emails(page),
    }
}

/// Extracts the anchors worth following from a page
///
/// # Link Rules
///
/// Every `<a href>` is resolved against the page address. A candidate is
/// dropped when:
/// - it names a PDF (`.pdf` suffix or a `/pdf/` path segment)
/// - its absolute form does not start with `origin` (plain string prefix)
/// - it is already in `visited`
///
/// No other normalisation happens: two spellings of the same resource are two
/// different addresses.
///
/// # Example
///
/// ```
/// use ripple_harvest::crawler::{extract_links, ParsedPage, VisitedSet};
///
/// let page = ParsedPage::parse(
///     "https://site.com/",
///     r#"<a href="/a">A</a><a href="/b.pdf">B</a><a href="https://other.com/c">C</a>"#,
/// );
/// let links = extract_links(&page, "https://site.com", &VisitedSet::new());
/// assert_eq!(links, vec!["https://site.com/a".to_string()]);
/// ```
pub fn extract_links(page: &ParsedPage, origin: &str, visited: &VisitedSet) -> Vec<String> {
    let Ok(base_url) = Url::parse(&page.url) else {
        tracing::warn!("Cannot resolve links against unparseable address {}", page.url);
        return Vec::new();
    };

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in page.document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute_url) = resolve_link(href, &base_url) else {
            continue;
        };

        if !is_crawlable(&absolute_url)
            || !absolute_url.starts_with(origin)
            || visited.contains(&absolute_url)
        {
            continue;
        }

        if seen.insert(absolute_url.clone()) {
            links.push(absolute_url);
        }
    }

    links
}

/// Returns false for resources the crawler never fetches
pub fn is_crawlable(url: &str) -> bool {
    !(url.ends_with(".pdf") || url.contains("/pdf/"))
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves a link href to an absolute URL
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links and for
/// anything that does not resolve to HTTP(S).
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
