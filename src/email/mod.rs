//! Email harvesting
//!
//! This module holds everything that turns a parsed page into email records:
//! - Cloudflare payload decoding (`deobfuscate`)
//! - The two discovery strategies run against every page (`strategy`)
//! - The record type and the set records accumulate in

mod deobfuscate;
mod strategy;

pub use deobfuscate::{decode_cf_email, encode_cf_email};
pub use strategy::{harvest_emails, EmailStrategy};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Context recorded when a page has no usable `<title>`
pub const NO_TITLE: &str = "No Title";

/// One harvested address together with where it was found
///
/// Records are compared on all three fields, so the same address seen with a
/// different context string is kept as a separate record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmailRecord {
    /// The email address
    #[serde(rename = "email")]
    pub address: String,

    /// Address of the page the email was found on
    pub source_url: String,

    /// Page title or a nearby human-readable label
    pub context: String,
}

impl EmailRecord {
    pub fn new(
        address: impl Into<String>,
        source_url: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            source_url: source_url.into(),
            context: context.into(),
        }
    }
}

/// Ordered set of records; byte-identical tuples collapse
pub type EmailSet = BTreeSet<EmailRecord>;

/// Number of distinct addresses in a record set, ignoring source and context
pub fn unique_addresses(emails: &EmailSet) -> usize {
    emails
        .iter()
        .map(|record| record.address.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}
