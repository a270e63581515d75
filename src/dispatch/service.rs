//! Worker capability interface
//!
//! The dispatch layer talks to workers only through [`WorkerService`]. Any
//! transport can implement it; [`LocalWorker`] is the in-process one and
//! [`HttpWorker`](crate::dispatch::HttpWorker) the networked one.

use crate::crawler::{CrawlBudget, CrawlRequest, PageFetcher, Worker};
use crate::email::EmailRecord;
use crate::{RemoteCallError, RemoteResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;
use url::Url;

/// Opaque address of a worker as stored in the directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerHandle(String);

impl WorkerHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A worker bound for a session: its directory name, handle and reported id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub id: u32,
    pub name: String,
    pub handle: WorkerHandle,
}

/// The three operations a worker exposes
///
/// Every call returns copies; a worker's visited set and email records never
/// leave the worker by reference.
#[async_trait]
pub trait WorkerService: Send + Sync {
    /// Stable id used to name output files
    async fn get_identity(&self) -> RemoteResult<u32>;

    /// Runs one bounded local crawl and returns the number of pages visited
    async fn crawl(&self, start_url: &str, time_limit_minutes: u64) -> RemoteResult<u64>;

    /// Snapshot of every email record the worker holds
    async fn get_emails(&self) -> RemoteResult<Vec<EmailRecord>>;
}

/// In-process [`WorkerService`] around a [`Worker`]
///
/// Calls are serialised through a mutex, so one crawl runs at a time.
pub struct LocalWorker<F> {
    worker: Mutex<Worker<F>>,
    max_pages: Option<u64>,
}

impl<F: PageFetcher> LocalWorker<F> {
    pub fn new(worker: Worker<F>) -> Self {
        Self {
            worker: Mutex::new(worker),
            max_pages: None,
        }
    }

    /// Page ceiling applied to every crawl this worker runs
    pub fn with_max_pages(mut self, max_pages: Option<u64>) -> Self {
        self.max_pages = max_pages;
        self
    }
}

#[async_trait]
impl<F: PageFetcher + 'static> WorkerService for LocalWorker<F> {
    async fn get_identity(&self) -> RemoteResult<u32> {
        Ok(self.worker.lock().await.id())
    }

    async fn crawl(&self, start_url: &str, time_limit_minutes: u64) -> RemoteResult<u64> {
        Url::parse(start_url).map_err(|e| {
            RemoteCallError::Worker(format!("invalid start URL {:?}: {}", start_url, e))
        })?;

        let budget = CrawlBudget::from_minutes(time_limit_minutes).max_units(self.max_pages);
        let request = CrawlRequest::new(start_url, budget);

        let mut worker = self.worker.lock().await;
        let report = worker.crawl(&request).await;
        Ok(report.pages_visited)
    }

    async fn get_emails(&self) -> RemoteResult<Vec<EmailRecord>> {
        Ok(self.worker.lock().await.emails().iter().cloned().collect())
    }
}
