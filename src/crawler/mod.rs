//! Crawler module for bounded breadth-first harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching
//! - HTML parsing, link extraction and email extraction
//! - The breadth-first frontier and crawl budgets
//! - The local crawl loop that ties them together

mod fetcher;
mod frontier;
mod parser;
mod worker;

pub use fetcher::{build_http_client, fetch_url, FetchedPage, HttpFetcher, PageFetcher};
pub use frontier::{CrawlBudget, Frontier, FrontierEntry, VisitedSet};
pub use parser::{extract, extract_links, is_crawlable, Extraction, ParsedPage};
pub use worker::{CrawlReport, CrawlRequest, Worker};

use crate::config::Config;
use crate::email::EmailSet;
use crate::HarvestError;

/// Runs a complete stand-alone crawl
///
/// This is the main entry point for a single-process harvest. It will:
/// 1. Build the HTTP client from configuration
/// 2. Run one local crawl loop to completion or budget exhaustion
/// 3. Hand back the report and every email record found
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - Seed address, origin prefix and budget
///
/// # Returns
///
/// * `Ok((CrawlReport, EmailSet))` - Crawl finished (possibly with zero pages)
/// * `Err(HarvestError)` - The HTTP client could not be built
pub async fn crawl(
    config: &Config,
    request: &CrawlRequest,
) -> Result<(CrawlReport, EmailSet), HarvestError> {
    let fetcher = HttpFetcher::new(&config.crawler)?;
    let mut worker = Worker::new(0, fetcher);
    let report = worker.crawl(request).await;
    Ok((report, worker.into_emails()))
}
