//! Output module for persisting harvest results
//!
//! This module handles:
//! - Writing email records to CSV
//! - Writing and printing crawl statistics

mod emails;
pub mod stats;

pub use emails::{save_emails_csv, write_emails_csv, EMAIL_CSV_HEADER};
pub use stats::{print_statistics, save_statistics, ElapsedUnit, HarvestStatistics};

use crate::email::{unique_addresses, EmailSet};
use crate::HarvestError;
use std::path::Path;

/// Where a harvest's two output files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub emails: String,
    pub stats: String,
}

impl OutputPaths {
    pub fn new(emails: impl Into<String>, stats: impl Into<String>) -> Self {
        Self {
            emails: emails.into(),
            stats: stats.into(),
        }
    }

    /// Per-worker file names used by dispatch sessions
    pub fn for_worker(worker_id: u32) -> Self {
        Self::new(
            format!("emails_node_{}.csv", worker_id),
            format!("stats_node_{}.txt", worker_id),
        )
    }
}

/// Builds the statistics block for a finished harvest
pub fn statistics_for(
    total_pages: u64,
    emails: &EmailSet,
    started_at: chrono::DateTime<chrono::Utc>,
    elapsed: std::time::Duration,
    unit: ElapsedUnit,
) -> HarvestStatistics {
    HarvestStatistics {
        total_pages,
        total_emails: emails.len(),
        unique_addresses: unique_addresses(emails),
        started_at,
        elapsed,
        unit,
    }
}

/// Writes both output files
///
/// # Returns
///
/// * `Ok(())` - Both files written
/// * `Err(HarvestError)` - A file could not be created or written
pub fn save_report(
    paths: &OutputPaths,
    emails: &EmailSet,
    stats: &HarvestStatistics,
) -> Result<(), HarvestError> {
    save_emails_csv(Path::new(&paths.emails), emails)?;
    save_statistics(Path::new(&paths.stats), stats)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::EmailRecord;
    use std::time::Duration;

    #[test]
    fn test_worker_paths() {
        let paths = OutputPaths::for_worker(3);
        assert_eq!(paths.emails, "emails_node_3.csv");
        assert_eq!(paths.stats, "stats_node_3.txt");
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(
            dir.path().join("e.csv").to_string_lossy(),
            dir.path().join("s.txt").to_string_lossy(),
        );
        let mut emails = EmailSet::new();
        emails.insert(EmailRecord::new("a@site.com", "https://site.com/", "Home"));
        emails.insert(EmailRecord::new("a@site.com", "https://site.com/x", "X"));

        let stats = statistics_for(
            2,
            &emails,
            chrono::Utc::now(),
            Duration::from_secs(3),
            ElapsedUnit::Seconds,
        );
        assert_eq!(stats.total_emails, 2);
        assert_eq!(stats.unique_addresses, 1);

        save_report(&paths, &emails, &stats).unwrap();
        assert!(std::fs::read_to_string(&paths.stats)
            .unwrap()
            .contains("Total Emails Found: 2"));
        assert_eq!(std::fs::read_to_string(&paths.emails).unwrap().lines().count(), 3);
    }
}
