use serde::Deserialize;

/// Upper bound accepted for `request-timeout-secs`
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Main configuration structure for Ripple-Harvest
///
/// Every section is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub directory: DirectoryConfig,
    pub worker: WorkerConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Per-request timeout for page fetches (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Page ceiling applied to every crawl unless overridden
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u64>,

    /// User-Agent header sent with every fetch
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_pages: None,
            user_agent: format!("ripple-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output configuration for stand-alone crawls
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the emails CSV file
    #[serde(rename = "emails-path")]
    pub emails_path: String,

    /// Path to the statistics text file
    #[serde(rename = "stats-path")]
    pub stats_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            emails_path: "emails.csv".to_string(),
            stats_path: "stats.txt".to_string(),
        }
    }
}

/// Where the directory service lives and how workers are named in it
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory host
    pub host: String,

    /// Directory port
    pub port: u16,

    /// Name prefix shared by every registered worker
    #[serde(rename = "worker-prefix")]
    pub worker_prefix: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
            worker_prefix: "harvest.node.".to_string(),
        }
    }
}

impl DirectoryConfig {
    /// Base URL of the directory service
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Worker node configuration for the `serve` command
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Interface worker nodes listen on
    #[serde(rename = "bind-host")]
    pub bind_host: String,

    /// Host written into registered handles (defaults to `bind-host`)
    #[serde(rename = "advertise-host")]
    pub advertise_host: Option<String>,

    /// Number of worker nodes to start
    pub nodes: u32,
}

impl WorkerConfig {
    /// Host other processes should use to reach a worker
    pub fn advertised_host(&self) -> &str {
        self.advertise_host.as_deref().unwrap_or(&self.bind_host)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            advertise_host: None,
            nodes: 1,
        }
    }
}
