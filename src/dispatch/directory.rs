//! Directory (name lookup) contract
//!
//! Workers register under a name; the dispatcher looks them up by name
//! prefix. Nothing else couples the two sides.

use crate::dispatch::remote::{check_status, parse_base, read_json, unreachable, CALL_TIMEOUT};
use crate::dispatch::service::WorkerHandle;
use crate::{RemoteCallError, RemoteResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;
use url::Url;

/// One registered name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub handle: WorkerHandle,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, handle: WorkerHandle) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

/// Query string of `GET /lookup`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub prefix: String,
}

/// The directory service contract
#[async_trait]
pub trait Directory: Send + Sync {
    /// Binds `name` to `handle`, replacing any earlier binding
    async fn register(&self, name: &str, handle: WorkerHandle) -> RemoteResult<()>;

    /// Every entry whose name starts with `prefix`
    ///
    /// Entries come back in natural name order (`node.2` before `node.10`).
    async fn lookup(&self, prefix: &str) -> RemoteResult<Vec<DirectoryEntry>>;
}

/// In-memory directory, also the backing store of the directory server
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<BTreeMap<String, WorkerHandle>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn register(&self, name: &str, handle: WorkerHandle) -> RemoteResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RemoteCallError::Worker("directory lock poisoned".to_string()))?;

        tracing::info!("Registered {} -> {}", name, handle);
        entries.insert(name.to_string(), handle);
        Ok(())
    }

    async fn lookup(&self, prefix: &str) -> RemoteResult<Vec<DirectoryEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RemoteCallError::Worker("directory lock poisoned".to_string()))?;

        let mut found: Vec<DirectoryEntry> = entries
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, handle)| DirectoryEntry::new(name.clone(), handle.clone()))
            .collect();
        sort_natural(&mut found);
        Ok(found)
    }
}

/// Client for a remote directory server
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: Client,
    base: Url,
}

impl HttpDirectory {
    /// Connects to the directory at `base_url` (e.g. `http://10.0.0.1:9090`)
    pub fn connect(base_url: &str) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| unreachable(base_url, e))?;

        Ok(Self {
            client,
            base: parse_base(base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> RemoteResult<Url> {
        self.base.join(path).map_err(|e| RemoteCallError::Unreachable {
            handle: self.base.to_string(),
            message: format!("bad endpoint {}: {}", path, e),
        })
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn register(&self, name: &str, handle: WorkerHandle) -> RemoteResult<()> {
        let entry = DirectoryEntry::new(name, handle);
        let response = self
            .client
            .post(self.endpoint("register")?)
            .json(&entry)
            .send()
            .await;
        check_status(self.base.as_str(), response).await?;
        Ok(())
    }

    async fn lookup(&self, prefix: &str) -> RemoteResult<Vec<DirectoryEntry>> {
        let response = self
            .client
            .get(self.endpoint("lookup")?)
            .query(&[("prefix", prefix)])
            .send()
            .await;
        let mut found: Vec<DirectoryEntry> = read_json(self.base.as_str(), response).await?;
        sort_natural(&mut found);
        Ok(found)
    }
}

/// Orders names so that numeric suffixes compare by length first
fn sort_natural(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        a.name
            .len()
            .cmp(&b.name.len())
            .then_with(|| a.name.cmp(&b.name))
    });
}
