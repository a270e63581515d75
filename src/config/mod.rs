//! Configuration module for Ripple-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file is optional; every key has a default.
//!
//! # Example
//!
//! ```no_run
//! use ripple_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Directory at {}", config.directory.base_url());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DirectoryConfig, OutputConfig, WorkerConfig, MAX_REQUEST_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
