//! Ripple-Harvest main entry point
//!
//! This is the command-line interface for the Ripple-Harvest email harvester.

mod prompt;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use ripple_harvest::config::{load_config_with_hash, Config};
use ripple_harvest::crawler::{crawl, CrawlBudget, CrawlRequest};
use ripple_harvest::dispatch::{
    bind_worker, directory_router, run_session, serve, start_worker_nodes, Directory,
    Dispatcher, HttpDirectory, HttpWorker, MemoryDirectory, SessionRequest, WorkerSelection,
};
use ripple_harvest::output::{
    print_statistics, save_report, statistics_for, ElapsedUnit, OutputPaths,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Ripple-Harvest: a bounded contact-address harvester
///
/// Ripple-Harvest walks one web origin breadth-first within a time and page
/// budget, collecting plain and Cloudflare-obfuscated email addresses. The
/// walk can run locally or on worker nodes found through a directory.
#[derive(Parser, Debug)]
#[command(name = "ripple-harvest")]
#[command(version)]
#[command(about = "A bounded contact-address harvester", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site in this process
    Crawl {
        /// URL of the website to harvest
        url: String,

        /// Time limit in minutes
        time_limit: u64,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u64>,

        /// Only follow links starting with this prefix (defaults to URL)
        #[arg(long)]
        origin: Option<String>,

        /// Output CSV file for emails
        #[arg(long)]
        output_emails: Option<String>,

        /// Output text file for statistics
        #[arg(long)]
        output_stats: Option<String>,
    },

    /// Start worker nodes and register them in the directory
    Serve {
        /// Number of nodes to start
        #[arg(long)]
        nodes: Option<u32>,

        /// Directory host
        #[arg(long)]
        directory_host: Option<String>,

        /// Directory port
        #[arg(long)]
        directory_port: Option<u16>,
    },

    /// Run the directory service
    Directory {
        /// Interface to listen on
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Interactively dispatch crawls to a registered worker
    Dispatch {
        /// Directory host (prompted for when omitted)
        #[arg(long)]
        directory_host: Option<String>,

        /// Directory port (prompted for when omitted)
        #[arg(long)]
        directory_port: Option<u16>,

        /// Feed source URLs of returned records back into the session frontier
        #[arg(long)]
        redispatch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Crawl {
            url,
            time_limit,
            max_pages,
            origin,
            output_emails,
            output_stats,
        } => {
            let paths = OutputPaths::new(
                output_emails.unwrap_or_else(|| config.output.emails_path.clone()),
                output_stats.unwrap_or_else(|| config.output.stats_path.clone()),
            );
            handle_crawl(&config, url, time_limit, max_pages, origin, paths).await
        }
        Command::Serve {
            nodes,
            directory_host,
            directory_port,
        } => {
            let mut config = config;
            if let Some(nodes) = nodes {
                config.worker.nodes = nodes;
            }
            if let Some(host) = directory_host {
                config.directory.host = host;
            }
            if let Some(port) = directory_port {
                config.directory.port = port;
            }
            handle_serve(&config).await
        }
        Command::Directory { host, port } => {
            let host = host.unwrap_or_else(|| config.directory.host.clone());
            let port = port.unwrap_or(config.directory.port);
            handle_directory(&host, port).await
        }
        Command::Dispatch {
            directory_host,
            directory_port,
            redispatch,
        } => handle_dispatch(&config, directory_host, directory_port, redispatch).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_harvest=info,warn"),
            1 => EnvFilter::new("ripple_harvest=debug,info"),
            2 => EnvFilter::new("ripple_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the stand-alone crawl
async fn handle_crawl(
    config: &Config,
    url: String,
    time_limit: u64,
    max_pages: Option<u64>,
    origin: Option<String>,
    paths: OutputPaths,
) -> anyhow::Result<()> {
    Url::parse(&url).with_context(|| format!("invalid URL {:?}", url))?;

    let budget =
        CrawlBudget::from_minutes(time_limit).max_units(max_pages.or(config.crawler.max_pages));
    let mut request = CrawlRequest::new(url, budget);
    if let Some(origin) = origin {
        request = request.with_origin(origin);
    }

    let (report, emails) = crawl(config, &request).await?;

    let stats = statistics_for(
        report.pages_visited,
        &emails,
        report.started_at,
        report.elapsed,
        ElapsedUnit::Seconds,
    );
    save_report(&paths, &emails, &stats)?;

    print_statistics(&stats);
    println!("\n=== Results ===");
    println!("Emails saved to: {}", paths.emails);
    println!("Statistics saved to: {}", paths.stats);

    Ok(())
}

/// Handles the serve command: starts worker nodes and waits
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let directory = HttpDirectory::connect(&config.directory.base_url())?;
    let nodes = start_worker_nodes(config, &directory).await?;

    for node in &nodes {
        println!("Node {} registered with handle: {}", node.id, node.handle);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down {} worker node(s)", nodes.len());
    for node in nodes {
        node.task.abort();
    }
    Ok(())
}

/// Handles the directory command
async fn handle_directory(host: &str, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("cannot listen on {}:{}", host, port))?;
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::new());
    serve(listener, directory_router(directory)).await?;
    Ok(())
}

/// Handles the interactive dispatch command
async fn handle_dispatch(
    config: &Config,
    directory_host: Option<String>,
    directory_port: Option<u16>,
    redispatch: bool,
) -> anyhow::Result<()> {
    let host = match directory_host {
        Some(host) => host,
        None => prompt::prompt_or("Enter the directory host", config.directory.host.clone())?,
    };
    let port = match directory_port {
        Some(port) => port,
        None => prompt::prompt_or("Enter the directory port", config.directory.port)?,
    };

    let directory = HttpDirectory::connect(&format!("http://{}:{}", host, port))?;
    let dispatcher = Dispatcher::discover(&directory, &config.directory.worker_prefix).await?;
    if dispatcher.is_empty() {
        println!("No worker nodes are registered. Please start the directory and nodes.");
        return Ok(());
    }

    println!("Available worker nodes:");
    for (i, entry) in dispatcher.entries().iter().enumerate() {
        println!("  {}: {} ({})", i + 1, entry.name, entry.handle);
    }
    let choice: usize = prompt::prompt_or("Select a node by number", 1)?;
    let entry = dispatcher
        .select(WorkerSelection::Index(choice.saturating_sub(1)))
        .ok_or_else(|| anyhow!("no worker node numbered {}", choice))?;

    let worker = HttpWorker::connect(entry.handle.clone())?;
    let identity = bind_worker(entry, &worker).await?;

    loop {
        let start_url: String = prompt::prompt_required("Enter the URL to scrape: ")?;
        if let Err(e) = Url::parse(&start_url) {
            println!("Invalid URL {:?}: {}", start_url, e);
            continue;
        }
        let minutes: u64 = prompt::prompt_required("Enter the scraping time limit (minutes): ")?;

        let request = SessionRequest::new(start_url, minutes).with_redispatch(redispatch);
        let aggregate = run_session(&worker, &identity, &request).await;

        let paths = OutputPaths::for_worker(identity.id);
        let stats = statistics_for(
            aggregate.total_pages,
            &aggregate.emails,
            aggregate.started_at,
            aggregate.elapsed,
            ElapsedUnit::Minutes,
        );
        save_report(&paths, &aggregate.emails, &stats)?;
        println!("Scraping completed. Emails saved to {}.", paths.emails);
        println!("Statistics saved to {}.", paths.stats);

        if prompt::confirm("Do you want to quit?")? {
            break;
        }
    }

    Ok(())
}
