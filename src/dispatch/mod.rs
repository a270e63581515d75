//! Distributed dispatch
//!
//! This module lets a crawl run inside separate worker processes:
//! - `service`: the [`WorkerService`] capability and the in-process worker
//! - `remote`: the HTTP client side of that capability
//! - `server`: axum routers exposing workers and the directory
//! - `directory`: the register/lookup contract used to find workers
//! - `session`: picking one worker and aggregating a session's results

mod directory;
mod remote;
mod server;
mod service;
mod session;

pub use directory::{Directory, DirectoryEntry, HttpDirectory, LookupQuery, MemoryDirectory};
pub use remote::{CrawlCall, CrawlReply, ErrorReply, HttpWorker, IdentityReply};
pub use server::{directory_router, serve, worker_router};
pub use service::{LocalWorker, WorkerHandle, WorkerIdentity, WorkerService};
pub use session::{
    bind_worker, run_session, Dispatcher, SessionAggregate, SessionRequest, WorkerSelection,
};

use crate::config::Config;
use crate::crawler::{HttpFetcher, Worker};
use crate::HarvestError;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A worker node serving on its own port
#[derive(Debug)]
pub struct WorkerNode {
    pub id: u32,
    pub name: String,
    pub handle: WorkerHandle,
    pub task: JoinHandle<std::io::Result<()>>,
}

/// Starts worker node `id` and registers it in `directory`
///
/// The node listens on an ephemeral port of the configured bind host and is
/// registered as `<worker-prefix><id>`.
pub async fn start_worker_node<D: Directory + ?Sized>(
    id: u32,
    config: &Config,
    directory: &D,
) -> Result<WorkerNode, HarvestError> {
    let listener = TcpListener::bind((config.worker.bind_host.as_str(), 0)).await?;
    let port = listener.local_addr()?.port();
    let handle = WorkerHandle::new(format!(
        "http://{}:{}",
        config.worker.advertised_host(),
        port
    ));

    let fetcher = HttpFetcher::new(&config.crawler)?;
    let service: Arc<dyn WorkerService> = Arc::new(
        LocalWorker::new(Worker::new(id, fetcher)).with_max_pages(config.crawler.max_pages),
    );
    let task = tokio::spawn(serve(listener, worker_router(service)));

    let name = format!("{}{}", config.directory.worker_prefix, id);
    directory.register(&name, handle.clone()).await?;
    tracing::info!("Node {} registered as {} at {}", id, name, handle);

    Ok(WorkerNode {
        id,
        name,
        handle,
        task,
    })
}

/// Starts nodes `1..=config.worker.nodes`
pub async fn start_worker_nodes<D: Directory + ?Sized>(
    config: &Config,
    directory: &D,
) -> Result<Vec<WorkerNode>, HarvestError> {
    let mut nodes = Vec::with_capacity(config.worker.nodes as usize);
    for id in 1..=config.worker.nodes {
        nodes.push(start_worker_node(id, config, directory).await?);
    }
    Ok(nodes)
}
