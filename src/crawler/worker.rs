//! Local crawl loop
//!
//! A [`Worker`] owns one crawler's state (visited set, email records, page
//! counter) and drives its frontier, the extractor and a [`PageFetcher`] until
//! the frontier drains or the budget runs out.

use crate::crawler::fetcher::{FetchedPage, PageFetcher};
use crate::crawler::frontier::{CrawlBudget, Frontier, VisitedSet};
use crate::crawler::parser::{extract, Extraction, ParsedPage};
use crate::email::EmailSet;
use crate::state::{CrawlState, StopReason};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Parameters of one bounded crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Seed address
    pub start_url: String,

    /// Prefix every followed link must start with
    pub origin: String,

    /// Time and page limits
    pub budget: CrawlBudget,
}

impl CrawlRequest {
    /// A request scoped to everything under `start_url`
    pub fn new(start_url: impl Into<String>, budget: CrawlBudget) -> Self {
        let start_url = start_url.into();
        Self {
            origin: start_url.clone(),
            start_url,
            budget,
        }
    }

    /// Overrides the origin prefix
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

/// Outcome of one crawl call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages fetched and processed
    pub pages_visited: u64,

    /// Dequeued addresses whose fetch failed
    pub pages_failed: u64,

    /// Records added to the worker's set by this call
    pub new_emails: usize,

    /// Final loop state
    pub state: CrawlState,

    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// How long the crawl ran
    pub elapsed: Duration,
}

/// A crawler and the state it accumulates
///
/// The visited set and email records persist across [`Worker::crawl`] calls;
/// the page counter restarts with each call.
pub struct Worker<F> {
    id: u32,
    fetcher: F,
    visited: VisitedSet,
    emails: EmailSet,
    page_count: u64,
}

impl<F: PageFetcher> Worker<F> {
    pub fn new(id: u32, fetcher: F) -> Self {
        Self {
            id,
            fetcher,
            visited: VisitedSet::new(),
            emails: EmailSet::new(),
            page_count: 0,
        }
    }

    /// Identifier used to name this worker's output
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Every record collected so far
    pub fn emails(&self) -> &EmailSet {
        &self.emails
    }

    /// Pages visited by the most recent crawl
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Consumes the worker, keeping only its records
    pub fn into_emails(self) -> EmailSet {
        self.emails
    }

    /// Runs one bounded breadth-first crawl
    ///
    /// The budget is checked before every dequeue, so a page fetched just
    /// before the limit may still queue links; those links are never fetched.
    /// Fetch failures are logged and skipped; the address stays visited.
    ///
    /// Dropping the returned future part-way leaves the worker consistent:
    /// every dequeued address is already in its visited set.
    pub async fn crawl(&mut self, request: &CrawlRequest) -> CrawlReport {
        let started = Instant::now();
        let started_at = Utc::now();
        let emails_before = self.emails.len();

        tracing::info!(
            "Worker {} starting crawl of {} (time limit {:?}, max pages {:?})",
            self.id,
            request.start_url,
            request.budget.time_limit,
            request.budget.max_units
        );

        let mut frontier = Frontier::with_visited(self.visited.clone());
        frontier.enqueue(request.start_url.as_str(), 0);

        self.page_count = 0;
        let mut pages_failed = 0;
        let mut state = CrawlState::Running;

        while state.is_running() {
            if request.budget.time_exhausted(started.elapsed()) {
                state.finish(StopReason::TimeLimit);
                continue;
            }
            if request.budget.units_exhausted(self.page_count) {
                state.finish(StopReason::UnitLimit);
                continue;
            }
            let Some(entry) = frontier.dequeue() else {
                state.finish(StopReason::FrontierEmpty);
                continue;
            };
            // Recorded before the fetch so a dropped crawl keeps it
            self.visited.insert(entry.url.clone());

            match self.fetcher.fetch(&entry.url).await {
                Ok(page) => {
                    let extraction = process_page(page, &request.origin, frontier.visited());
                    tracing::debug!(
                        "{} (depth {}): {} new links, {} emails",
                        entry.url,
                        entry.depth,
                        extraction.links.len(),
                        extraction.emails.len()
                    );

                    for link in extraction.links {
                        frontier.enqueue(link, entry.depth + 1);
                    }
                    self.emails.extend(extraction.emails);
                    self.page_count += 1;

                    if self.page_count % 10 == 0 {
                        tracing::info!(
                            "Progress: {} pages crawled, {} in frontier, {} emails",
                            self.page_count,
                            frontier.len(),
                            self.emails.len()
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Error fetching {}: {}", entry.url, e);
                    pages_failed += 1;
                }
            }
        }

        let report = CrawlReport {
            pages_visited: self.page_count,
            pages_failed,
            new_emails: self.emails.len() - emails_before,
            state,
            started_at,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Worker {} finished: {} pages, {} failed, {} new emails in {:?} ({})",
            self.id,
            report.pages_visited,
            report.pages_failed,
            report.new_emails,
            report.elapsed,
            report.state
        );

        report
    }
}

/// Parses a fetched page and runs both extraction passes
///
/// Kept synchronous so the parsed document never lives across an await.
fn process_page(page: FetchedPage, origin: &str, visited: &VisitedSet) -> Extraction {
    let parsed = ParsedPage::parse(page.final_url, page.body);
    extract(&parsed, origin, visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{encode_cf_email, EmailRecord};
    use crate::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages and records the order they were requested in
    #[derive(Default)]
    struct StaticFetcher {
        pages: HashMap<String, String>,
        stalled: Vec<String>,
        requested: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        /// Requests for `url` never complete
        fn stall(mut self, url: &str) -> Self {
            self.stalled.push(url.to_string());
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            if self.stalled.iter().any(|stalled| stalled == url) {
                std::future::pending::<()>().await;
            }
            match self.pages.get(url) {
                Some(body) => Ok(FetchedPage {
                    final_url: url.to_string(),
                    status_code: 200,
                    body: body.clone(),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn site() -> StaticFetcher {
        StaticFetcher::default()
            .page(
                "https://site.com/",
                r#"<html><head><title>Home</title></head><body>
                   <a href="/a">A</a><a href="/b">B</a><a href="/missing">Gone</a>
                   <a href="https://other.com/x">Elsewhere</a></body></html>"#,
            )
            .page(
                "https://site.com/a",
                r#"<html><head><title>A</title></head><body>
                   <a href="/">Home</a><a href="/a">Self</a><a href="/c">C</a>
                   <p>a-team@site.com</p></body></html>"#,
            )
            .page(
                "https://site.com/b",
                r#"<html><head><title>B</title></head><body><a href="/c">C</a></body></html>"#,
            )
            .page(
                "https://site.com/c",
                &format!(
                    r#"<html><head><title>C</title></head><body>
                       <span data-cfemail="{}">[email protected]</span></body></html>"#,
                    encode_cf_email("c@site.com", 0x42)
                ),
            )
    }

    fn request(budget: CrawlBudget) -> CrawlRequest {
        CrawlRequest::new("https://site.com/", budget)
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let mut worker = Worker::new(1, site());
        let report = worker.crawl(&request(CrawlBudget::from_minutes(5))).await;

        assert_eq!(
            worker.fetcher.requested(),
            vec![
                "https://site.com/",
                "https://site.com/a",
                "https://site.com/b",
                "https://site.com/missing",
                "https://site.com/c",
            ]
        );
        assert_eq!(report.pages_visited, 4);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.state, CrawlState::Done(StopReason::FrontierEmpty));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_visited() {
        let mut worker = Worker::new(1, site());
        worker.crawl(&request(CrawlBudget::from_minutes(5))).await;
        assert!(worker.visited().contains("https://site.com/missing"));
        assert!(!worker.visited().contains("https://other.com/x"));
    }

    #[tokio::test]
    async fn test_collects_both_email_kinds() {
        let mut worker = Worker::new(1, site());
        let report = worker.crawl(&request(CrawlBudget::from_minutes(5))).await;

        assert_eq!(report.new_emails, 2);
        assert!(worker
            .emails()
            .contains(&EmailRecord::new("a-team@site.com", "https://site.com/a", "A")));
        assert!(worker
            .emails()
            .contains(&EmailRecord::new("c@site.com", "https://site.com/c", "C")));
    }

    #[tokio::test]
    async fn test_zero_time_limit_visits_nothing() {
        let mut worker = Worker::new(1, site());
        let report = worker.crawl(&request(CrawlBudget::from_minutes(0))).await;

        assert_eq!(report.pages_visited, 0);
        assert_eq!(report.state, CrawlState::Done(StopReason::TimeLimit));
        assert!(worker.fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_unit_ceiling() {
        let mut worker = Worker::new(1, site());
        let report = worker
            .crawl(&request(CrawlBudget::from_minutes(5).max_units(Some(2))))
            .await;

        assert_eq!(report.pages_visited, 2);
        assert_eq!(report.state, CrawlState::Done(StopReason::UnitLimit));
        assert_eq!(worker.fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_state_persists_across_crawls() {
        let mut worker = Worker::new(1, site());
        worker.crawl(&request(CrawlBudget::from_minutes(5))).await;
        let emails = worker.emails().len();

        let again = worker.crawl(&request(CrawlBudget::from_minutes(5))).await;
        assert_eq!(again.pages_visited, 0);
        assert_eq!(again.new_emails, 0);
        assert_eq!(worker.page_count(), 0);
        assert_eq!(worker.emails().len(), emails);
    }

    #[tokio::test]
    async fn test_origin_override() {
        let mut worker = Worker::new(1, site());
        let request = CrawlRequest::new("https://site.com/", CrawlBudget::from_minutes(5))
            .with_origin("https://site.com/b");
        let report = worker.crawl(&request).await;

        assert_eq!(
            worker.fetcher.requested(),
            vec!["https://site.com/", "https://site.com/b"]
        );
        assert_eq!(report.pages_visited, 2);
    }

    #[tokio::test]
    async fn test_cancelled_crawl_keeps_visited_set() {
        let mut worker = Worker::new(1, site().stall("https://site.com/b"));
        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            worker.crawl(&request(CrawlBudget::from_minutes(5))),
        )
        .await;
        assert!(outcome.is_err());

        assert!(worker.visited().contains("https://site.com/"));
        assert!(worker.visited().contains("https://site.com/a"));
        assert!(worker.visited().contains("https://site.com/b"));
        assert_eq!(worker.emails().len(), 1);

        let again = worker.crawl(&request(CrawlBudget::from_minutes(5))).await;
        assert_eq!(again.pages_visited, 0);
        assert_eq!(
            worker.fetcher.requested(),
            vec!["https://site.com/", "https://site.com/a", "https://site.com/b"]
        );
    }
}
