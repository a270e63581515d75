//! Dispatch sessions
//!
//! A [`Dispatcher`] holds the worker entries found once through the
//! directory. A session commits to exactly one worker for its whole duration
//! and walks its own top-level frontier, handing each URL to that worker and
//! merging what comes back into a [`SessionAggregate`].
//!
//! The session's visited set is independent of the worker's. Both apply the
//! same filters to different observations, so they can drift apart; no
//! reconciliation is attempted.

use crate::crawler::{is_crawlable, CrawlBudget, Frontier};
use crate::dispatch::directory::{Directory, DirectoryEntry};
use crate::dispatch::service::{WorkerIdentity, WorkerService};
use crate::email::{EmailRecord, EmailSet};
use crate::RemoteResult;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// How a session picks its worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSelection {
    /// The first entry in directory order
    First,

    /// A zero-based index into the discovered entries
    Index(usize),
}

/// Worker entries discovered for the lifetime of a dispatcher
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    entries: Vec<DirectoryEntry>,
}

impl Dispatcher {
    /// Looks up every worker registered under `prefix`
    pub async fn discover<D: Directory + ?Sized>(directory: &D, prefix: &str) -> RemoteResult<Self> {
        let entries = directory.lookup(prefix).await?;
        tracing::info!("Discovered {} worker(s) under {:?}", entries.len(), prefix);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks the entry a session will use
    pub fn select(&self, selection: WorkerSelection) -> Option<&DirectoryEntry> {
        match selection {
            WorkerSelection::First => self.entries.first(),
            WorkerSelection::Index(index) => self.entries.get(index),
        }
    }
}

/// Asks a worker for its id and pairs it with its directory entry
pub async fn bind_worker<S: WorkerService + ?Sized>(
    entry: &DirectoryEntry,
    service: &S,
) -> RemoteResult<WorkerIdentity> {
    let id = service.get_identity().await?;
    tracing::info!("Bound worker {} ({}) with id {}", entry.name, entry.handle, id);
    Ok(WorkerIdentity {
        id,
        name: entry.name.clone(),
        handle: entry.handle.clone(),
    })
}

/// Parameters of one dispatch session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// First URL handed to the worker
    pub start_url: String,

    /// Prefix redispatched URLs must start with
    pub origin: String,

    /// Wall-clock limit for the whole session
    pub time_limit: Duration,

    /// Feed origin-matching source URLs from returned records back into the
    /// session frontier
    pub redispatch: bool,
}

impl SessionRequest {
    pub fn new(start_url: impl Into<String>, time_limit_minutes: u64) -> Self {
        let start_url = start_url.into();
        Self {
            origin: start_url.clone(),
            start_url,
            time_limit: CrawlBudget::from_minutes(time_limit_minutes).time_limit,
            redispatch: false,
        }
    }

    pub fn with_redispatch(mut self, redispatch: bool) -> Self {
        self.redispatch = redispatch;
        self
    }
}

/// Everything a session has gathered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAggregate {
    /// Id of the worker the session used
    pub worker_id: u32,

    /// Sum of page counts reported by the worker
    pub total_pages: u64,

    /// Union of every email snapshot returned
    pub emails: EmailSet,

    /// URLs handed to the worker, in dispatch order
    pub dispatched: Vec<String>,

    /// URLs whose crawl or get-emails call failed
    pub failed_calls: u64,

    pub started_at: DateTime<Utc>,

    pub elapsed: Duration,
}

impl SessionAggregate {
    fn new(worker_id: u32) -> Self {
        Self {
            worker_id,
            total_pages: 0,
            emails: EmailSet::new(),
            dispatched: Vec::new(),
            failed_calls: 0,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Folds one worker reply into the aggregate
    pub fn merge(&mut self, page_count: u64, emails: Vec<EmailRecord>) {
        self.total_pages += page_count;
        self.emails.extend(emails);
    }
}

/// Runs one session against `worker`
///
/// Each URL popped from the session frontier is sent to the worker's crawl
/// operation, followed by get-emails. A failed call is logged and the URL is
/// skipped; the session always completes.
pub async fn run_session<S: WorkerService + ?Sized>(
    worker: &S,
    identity: &WorkerIdentity,
    request: &SessionRequest,
) -> SessionAggregate {
    let started = Instant::now();
    let budget = CrawlBudget::with_time_limit(request.time_limit);
    let mut aggregate = SessionAggregate::new(identity.id);

    let mut frontier = Frontier::new();
    frontier.enqueue(request.start_url.as_str(), 0);

    tracing::info!(
        "Session on worker {} starting at {} ({:?})",
        identity.id,
        request.start_url,
        request.time_limit
    );

    while !budget.time_exhausted(started.elapsed()) {
        let Some(entry) = frontier.dequeue() else {
            break;
        };
        let minutes = remaining_minutes(request.time_limit, started.elapsed());

        tracing::info!("Sending URL to worker {}: {}", identity.id, entry.url);
        aggregate.dispatched.push(entry.url.clone());

        match dispatch_one(worker, &entry.url, minutes).await {
            Ok((page_count, emails)) => {
                if request.redispatch {
                    for record in &emails {
                        if record.source_url.starts_with(&request.origin)
                            && is_crawlable(&record.source_url)
                        {
                            frontier.enqueue(record.source_url.as_str(), entry.depth + 1);
                        }
                    }
                }

                aggregate.merge(page_count, emails);
                tracing::info!(
                    "Processed {} pages, found {} emails so far",
                    page_count,
                    aggregate.emails.len()
                );
            }
            Err(e) => {
                tracing::warn!("Error while processing URL {}: {}", entry.url, e);
                aggregate.failed_calls += 1;
            }
        }
    }

    aggregate.elapsed = started.elapsed();
    tracing::info!(
        "Session on worker {} finished: {} URLs dispatched, {} pages, {} emails in {:?}",
        identity.id,
        aggregate.dispatched.len(),
        aggregate.total_pages,
        aggregate.emails.len(),
        aggregate.elapsed
    );

    aggregate
}

async fn dispatch_one<S: WorkerService + ?Sized>(
    worker: &S,
    url: &str,
    minutes: u64,
) -> RemoteResult<(u64, Vec<EmailRecord>)> {
    let page_count = worker.crawl(url, minutes).await?;
    let emails = worker.get_emails().await?;
    Ok((page_count, emails))
}

/// Session time left, rounded up to whole minutes
fn remaining_minutes(time_limit: Duration, elapsed: Duration) -> u64 {
    let remaining = time_limit.saturating_sub(elapsed);
    (remaining.as_secs_f64() / 60.0).ceil() as u64
}
