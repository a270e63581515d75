//! Email discovery strategies
//!
//! Every page is run through both strategies unconditionally:
//!
//! **PlainText** scans rendered text nodes for anything shaped like an address.
//! The record's context is the text of the enclosing link, or of the nearest
//! preceding block-level sibling, or the page title.
//!
//! **ObfuscatedMarker** scans the raw markup for Cloudflare payloads
//! (`data-cfemail="…"` and `/cdn-cgi/l/email-protection#…`) and decodes them.
//! The record's context is the page title.

use crate::crawler::ParsedPage;
use crate::email::{decode_cf_email, EmailRecord, EmailSet};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use std::collections::BTreeSet;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

static CF_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-cfemail="([^"]*)""#).expect("valid cfemail pattern"));

static CF_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/cdn-cgi/l/email-protection#([0-9A-Fa-f]+)").expect("valid protection pattern")
});

/// Elements whose text is never rendered
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements treated as block-level when looking for a nearby label
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "p", "section", "td", "th",
    "tr",
];

/// A way of discovering email addresses on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailStrategy {
    /// Addresses written out in rendered text
    PlainText,

    /// Addresses hidden behind Cloudflare XOR payloads
    ObfuscatedMarker,
}

impl EmailStrategy {
    /// All strategies, in the order they run
    pub const ALL: [EmailStrategy; 2] = [Self::ObfuscatedMarker, Self::PlainText];

    /// Runs this strategy over one page
    pub fn harvest(&self, page: &ParsedPage) -> Vec<EmailRecord> {
        match self {
            Self::PlainText => harvest_plain_text(page),
            Self::ObfuscatedMarker => harvest_obfuscated(page),
        }
    }
}

/// Runs every strategy over `page` and collects the records into one set
pub fn harvest_emails(page: &ParsedPage) -> EmailSet {
    EmailStrategy::ALL
        .iter()
        .flat_map(|strategy| strategy.harvest(page))
        .collect()
}

fn harvest_obfuscated(page: &ParsedPage) -> Vec<EmailRecord> {
    let payloads: BTreeSet<&str> = CF_ATTRIBUTE
        .captures_iter(&page.markup)
        .chain(CF_LINK.captures_iter(&page.markup))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let mut records = Vec::new();
    for payload in payloads {
        match decode_cf_email(payload) {
            Ok(address) => records.push(EmailRecord::new(address, &page.url, &page.title)),
            Err(e) => {
                tracing::warn!("Failed to decode email payload {:?} on {}: {}", payload, page.url, e);
            }
        }
    }

    records
}

fn harvest_plain_text(page: &ParsedPage) -> Vec<EmailRecord> {
    let mut records = Vec::new();

    for node in page.document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if is_hidden(parent) {
            continue;
        }

        for found in EMAIL_PATTERN.find_iter(text) {
            let address = found.as_str();
            let context = nearby_label(parent, address).unwrap_or_else(|| page.title.clone());
            records.push(EmailRecord::new(address, &page.url, context));
        }
    }

    records
}

fn self_and_ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap))
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    self_and_ancestors(element).any(|el| HIDDEN_ELEMENTS.contains(&el.value().name()))
}

fn is_block(element: ElementRef<'_>) -> bool {
    BLOCK_ELEMENTS.contains(&element.value().name())
}

/// Best-effort human label for an address found under `parent`
fn nearby_label(parent: ElementRef<'_>, address: &str) -> Option<String> {
    // Link text, unless the link text is just the address again
    if let Some(anchor) = self_and_ancestors(parent).find(|el| el.value().name() == "a") {
        let text = collapsed_text(anchor);
        if !text.is_empty() && text != address {
            return Some(text);
        }
    }

    let block = self_and_ancestors(parent).find(|el| is_block(*el))?;
    block
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| is_block(*el))
        .map(collapsed_text)
        .find(|text| !text.is_empty() && !text.contains(address))
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
