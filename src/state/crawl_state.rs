/// Crawl loop state definitions
///
/// A local crawl loop is a two-state machine: it keeps `Running` until the
/// frontier drains or a budget predicate trips, after which it is `Done` and
/// records why it stopped.
use std::fmt;

/// Why a crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// No queued addresses remain
    FrontierEmpty,

    /// The wall-clock time limit elapsed
    TimeLimit,

    /// The page ceiling was reached
    UnitLimit,
}

/// Represents the current state of a crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrawlState {
    /// The loop is still pulling work from its frontier
    #[default]
    Running,

    /// The loop has finished
    Done(StopReason),
}

impl CrawlState {
    /// Returns true while the loop may dequeue another address
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true once the loop has finished
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// The reason the loop stopped, if it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Running => None,
            Self::Done(reason) => Some(*reason),
        }
    }

    /// Moves the loop to `Done`
    ///
    /// The first recorded reason wins; finishing an already finished loop
    /// keeps the original reason.
    pub fn finish(&mut self, reason: StopReason) {
        if self.is_running() {
            *self = Self::Done(reason);
        }
    }
}

impl StopReason {
    /// Short label used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierEmpty => "frontier_empty",
            Self::TimeLimit => "time_limit",
            Self::UnitLimit => "unit_limit",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Done(reason) => write!(f, "done ({})", reason),
        }
    }
}
