//! HTTP transport for workers
//!
//! [`HttpWorker`] implements [`WorkerService`] by calling a worker process's
//! JSON endpoints (see [`worker_router`](crate::dispatch::worker_router)).

use crate::config::MAX_REQUEST_TIMEOUT_SECS;
use crate::dispatch::service::{WorkerHandle, WorkerService};
use crate::email::EmailRecord;
use crate::{RemoteCallError, RemoteResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Timeout for the short calls (identity, emails, directory operations)
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time granted to a crawl call beyond its own time limit
///
/// A worker checks its budget only between fetches, so the last fetch may
/// start just before the limit and run for the longest accepted fetch timeout.
pub const CRAWL_GRACE: Duration = Duration::from_secs(MAX_REQUEST_TIMEOUT_SECS + 60);

/// Body of `GET /identity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityReply {
    pub id: u32,
}

/// Body of `POST /crawl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCall {
    pub start_url: String,
    pub time_limit_minutes: u64,
}

/// Reply to `POST /crawl`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReply {
    pub page_count: u64,
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

/// [`WorkerService`] reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpWorker {
    client: Client,
    handle: WorkerHandle,
    base: Url,
}

impl HttpWorker {
    /// Connects to the worker at `handle` (a base URL such as `http://10.0.0.5:41234`)
    pub fn connect(handle: WorkerHandle) -> RemoteResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| unreachable(handle.as_str(), e))?;
        Self::with_client(client, handle)
    }

    /// Connects using an existing client
    pub fn with_client(client: Client, handle: WorkerHandle) -> RemoteResult<Self> {
        let base = parse_base(handle.as_str())?;
        Ok(Self {
            client,
            handle,
            base,
        })
    }

    fn endpoint(&self, path: &str) -> RemoteResult<Url> {
        self.base
            .join(path)
            .map_err(|e| RemoteCallError::Unreachable {
                handle: self.handle.to_string(),
                message: format!("bad endpoint {}: {}", path, e),
            })
    }
}

#[async_trait]
impl WorkerService for HttpWorker {
    async fn get_identity(&self) -> RemoteResult<u32> {
        let response = self
            .client
            .get(self.endpoint("identity")?)
            .timeout(CALL_TIMEOUT)
            .send()
            .await;
        let reply: IdentityReply = read_json(self.handle.as_str(), response).await?;
        Ok(reply.id)
    }

    async fn crawl(&self, start_url: &str, time_limit_minutes: u64) -> RemoteResult<u64> {
        let timeout = crawl_call_timeout(time_limit_minutes);
        let call = CrawlCall {
            start_url: start_url.to_string(),
            time_limit_minutes,
        };

        tracing::debug!("Calling crawl({}, {}) on {}", start_url, time_limit_minutes, self.handle);
        let response = self
            .client
            .post(self.endpoint("crawl")?)
            .timeout(timeout)
            .json(&call)
            .send()
            .await;
        let reply: CrawlReply = read_json(self.handle.as_str(), response).await?;
        Ok(reply.page_count)
    }

    async fn get_emails(&self) -> RemoteResult<Vec<EmailRecord>> {
        let response = self
            .client
            .get(self.endpoint("emails")?)
            .timeout(CALL_TIMEOUT)
            .send()
            .await;
        read_json(self.handle.as_str(), response).await
    }
}

/// Client-side deadline for a crawl call of `time_limit_minutes`
fn crawl_call_timeout(time_limit_minutes: u64) -> Duration {
    Duration::from_secs(time_limit_minutes.saturating_mul(60))
        .checked_add(CRAWL_GRACE)
        .unwrap_or(Duration::MAX)
}

/// Parses a handle into a base URL that relative endpoints can be joined to
pub(crate) fn parse_base(handle: &str) -> RemoteResult<Url> {
    let with_slash = if handle.ends_with('/') {
        handle.to_string()
    } else {
        format!("{}/", handle)
    };

    Url::parse(&with_slash).map_err(|e| RemoteCallError::Unreachable {
        handle: handle.to_string(),
        message: format!("invalid handle: {}", e),
    })
}

pub(crate) fn unreachable(handle: &str, error: reqwest::Error) -> RemoteCallError {
    RemoteCallError::Unreachable {
        handle: handle.to_string(),
        message: error.to_string(),
    }
}

/// Passes successful responses through and turns everything else into an error
pub(crate) async fn check_status(
    handle: &str,
    response: Result<Response, reqwest::Error>,
) -> RemoteResult<Response> {
    let response = response.map_err(|e| unreachable(handle, e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorReply>().await {
        Ok(reply) => reply.error,
        Err(_) => status.to_string(),
    };
    Err(RemoteCallError::Rejected {
        handle: handle.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// Decodes the JSON body of a successful response
pub(crate) async fn read_json<T: DeserializeOwned>(
    handle: &str,
    response: Result<Response, reqwest::Error>,
) -> RemoteResult<T> {
    check_status(handle, response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| RemoteCallError::Unreachable {
            handle: handle.to_string(),
            message: format!("malformed reply: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_adds_slash() {
        let base = parse_base("http://127.0.0.1:4000").unwrap();
        assert_eq!(base.join("crawl").unwrap().as_str(), "http://127.0.0.1:4000/crawl");
    }

    #[test]
    fn test_parse_base_rejects_garbage() {
        assert!(matches!(
            parse_base("::nope::"),
            Err(RemoteCallError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_crawl_call_wire_format() {
        let call = CrawlCall {
            start_url: "https://site.com/".to_string(),
            time_limit_minutes: 3,
        };
        assert_eq!(
            serde_json::to_string(&call).unwrap(),
            r#"{"start_url":"https://site.com/","time_limit_minutes":3}"#
        );
    }

    #[test]
    fn test_crawl_call_outlasts_slowest_fetch() {
        let timeout = crawl_call_timeout(1);
        assert!(timeout >= Duration::from_secs(60 + MAX_REQUEST_TIMEOUT_SECS));
        assert_eq!(crawl_call_timeout(0), CRAWL_GRACE);
    }

    #[test]
    fn test_crawl_call_timeout_saturates() {
        assert_eq!(crawl_call_timeout(u64::MAX), Duration::MAX);
        assert_eq!(crawl_call_timeout(u64::MAX / 60), Duration::MAX);
    }

    #[tokio::test]
    async fn test_unreachable_worker() {
        let worker = HttpWorker::connect(WorkerHandle::new("http://127.0.0.1:9")).unwrap();
        assert!(matches!(
            worker.get_identity().await,
            Err(RemoteCallError::Unreachable { .. })
        ));
    }
}
