//! Breadth-first frontier with visited-set deduplication and crawl budgets
//!
//! The frontier is a strict FIFO queue of `(address, depth)` entries plus the
//! set of addresses already dequeued. An address can sit in the queue at most
//! once, and once dequeued it is never accepted again by the same frontier.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// Addresses already dequeued and processed
///
/// Membership is exact string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`; returns false if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// An address waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Absolute address
    pub url: String,

    /// Link distance from the seed (tracked, never used as a cutoff)
    pub depth: u32,
}

/// Termination predicates for a crawl session
///
/// The first exhausted budget wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlBudget {
    /// Wall-clock limit measured from session start
    pub time_limit: Duration,

    /// Optional ceiling on pages successfully visited
    pub max_units: Option<u64>,
}

impl CrawlBudget {
    /// A budget bounded only by time
    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            time_limit,
            max_units: None,
        }
    }

    /// A budget of whole minutes, the unit the command line and workers speak
    pub fn from_minutes(minutes: u64) -> Self {
        Self::with_time_limit(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Adds (or clears) a page ceiling
    pub fn max_units(mut self, max_units: Option<u64>) -> Self {
        self.max_units = max_units;
        self
    }

    /// Returns true when the time limit has elapsed
    pub fn time_exhausted(&self, elapsed: Duration) -> bool {
        elapsed >= self.time_limit
    }

    /// Returns true when the page ceiling has been reached
    pub fn units_exhausted(&self, units: u64) -> bool {
        self.max_units.is_some_and(|max| units >= max)
    }

    /// Returns true when either predicate has tripped
    pub fn is_exhausted(&self, elapsed: Duration, units: u64) -> bool {
        self.time_exhausted(elapsed) || self.units_exhausted(units)
    }
}

/// FIFO crawl frontier
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<String>,
    visited: VisitedSet,
}

impl Frontier {
    /// Creates an empty frontier with an empty visited set
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue on top of an existing visited set
    ///
    /// Workers carry their visited set across crawl calls; everything in it
    /// is refused by this frontier.
    pub fn with_visited(visited: VisitedSet) -> Self {
        Self {
            visited,
            ..Self::default()
        }
    }

    /// Queues `url` at `depth`
    ///
    /// Returns false (and does nothing) if the address is already visited or
    /// already waiting in the queue.
    pub fn enqueue(&mut self, url: impl Into<String>, depth: u32) -> bool {
        let url = url.into();
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }

        self.queued.insert(url.clone());
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    /// Removes the oldest entry and records it as visited
    ///
    /// Recording happens on dequeue so that a page linking to itself, or a
    /// fetch that fails, can never put the same address back in the queue.
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.queued.remove(&entry.url);
        self.visited.insert(entry.url.clone());
        Some(entry)
    }

    /// Number of entries waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }
}
