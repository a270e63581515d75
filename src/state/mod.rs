//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the Running/Done machine a local crawl loop moves through
//! - `StopReason`: which condition ended a loop

mod crawl_state;

// Re-export main types
pub use crawl_state::{CrawlState, StopReason};
