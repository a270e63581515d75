//! Harvest statistics
//!
//! This module renders the statistics text file written at the end of a
//! stand-alone crawl or a dispatch session, and prints the same numbers
//! to stdout.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

/// Unit the elapsed time is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElapsedUnit {
    /// `Time taken: N.NN seconds` (stand-alone crawls)
    Seconds,

    /// `Scraping Time Taken: N.NN minutes` (dispatch sessions)
    Minutes,
}

/// Harvest statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestStatistics {
    /// Pages crawled
    pub total_pages: u64,

    /// Email records found (address, source, context tuples)
    pub total_emails: usize,

    /// Distinct addresses among those records
    pub unique_addresses: usize,

    /// When the crawl or session started
    pub started_at: DateTime<Utc>,

    /// How long it ran
    pub elapsed: Duration,

    /// How `elapsed` is written out
    pub unit: ElapsedUnit,
}

impl HarvestStatistics {
    /// Renders the statistics file content
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total Pages Crawled: {}", self.total_pages);
        let _ = writeln!(out, "Total Emails Found: {}", self.total_emails);
        let _ = writeln!(out, "Unique Addresses: {}", self.unique_addresses);
        let _ = writeln!(out, "Started At: {}", self.started_at.to_rfc3339());

        match self.unit {
            ElapsedUnit::Seconds => {
                let _ = writeln!(out, "Time taken: {:.2} seconds", self.elapsed.as_secs_f64());
            }
            ElapsedUnit::Minutes => {
                let _ = writeln!(
                    out,
                    "Scraping Time Taken: {:.2} minutes",
                    self.elapsed.as_secs_f64() / 60.0
                );
            }
        }

        out
    }
}

/// Writes the statistics text file to `path`
pub fn save_statistics(path: &Path, stats: &HarvestStatistics) -> std::io::Result<()> {
    std::fs::write(path, stats.render())?;
    tracing::info!("Wrote statistics to {}", path.display());
    Ok(())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");
    print!("{}", stats.render());

    let rate = if stats.elapsed.as_secs_f64() > 0.0 {
        stats.total_pages as f64 / stats.elapsed.as_secs_f64()
    } else {
        0.0
    };
    println!("Crawl Rate: {:.2} pages/sec", rate);
}
