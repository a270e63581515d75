//! Ripple-Harvest: a bounded contact-address harvester
//!
//! This crate walks a single web origin breadth-first under a time and/or page
//! budget, collecting email addresses (including Cloudflare-obfuscated ones),
//! and can delegate the walk to remote worker processes found through a
//! directory service.

pub mod config;
pub mod crawler;
pub mod dispatch;
pub mod email;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Ripple-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Remote call error: {0}")]
    Remote(#[from] RemoteCallError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// A page could not be fetched (network failure, timeout or non-2xx status)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request was addressed to
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::Status { url, .. } | Self::Network { url, .. } => url,
        }
    }
}

/// An obfuscated email payload could not be decoded
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("malformed hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// A call to a worker or directory process failed
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("{handle} unreachable: {message}")]
    Unreachable { handle: String, message: String },

    #[error("{handle} answered {status}: {message}")]
    Rejected {
        handle: String,
        status: u16,
        message: String,
    },

    #[error("worker failed: {0}")]
    Worker(String),
}

/// Result type alias for Ripple-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for remote worker and directory calls
pub type RemoteResult<T> = std::result::Result<T, RemoteCallError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlBudget, CrawlReport, CrawlRequest, Frontier, VisitedSet, Worker};
pub use email::{decode_cf_email, EmailRecord, EmailSet};
pub use state::CrawlState;
