//! HTTP endpoints for workers and the directory
//!
//! Worker endpoints:
//! - `GET /identity` -> `{"id": 3}`
//! - `POST /crawl` `{"start_url": "...", "time_limit_minutes": 5}` -> `{"page_count": 17}`
//! - `GET /emails` -> `[{"email": "...", "source_url": "...", "context": "..."}]`
//!
//! Directory endpoints:
//! - `POST /register` `{"name": "...", "handle": "..."}`
//! - `GET /lookup?prefix=...` -> `[{"name": "...", "handle": "..."}]`

use crate::dispatch::directory::{Directory, DirectoryEntry, LookupQuery};
use crate::dispatch::remote::{CrawlCall, CrawlReply, ErrorReply, IdentityReply};
use crate::dispatch::service::WorkerService;
use crate::email::EmailRecord;
use crate::RemoteCallError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// A [`RemoteCallError`] rendered as an HTTP error reply
struct ApiError(RemoteCallError);

impl From<RemoteCallError> for ApiError {
    fn from(error: RemoteCallError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RemoteCallError::Worker(_) => StatusCode::BAD_REQUEST,
            RemoteCallError::Unreachable { .. } | RemoteCallError::Rejected { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };
        let body = ErrorReply {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Routes exposing a [`WorkerService`]
pub fn worker_router(service: Arc<dyn WorkerService>) -> Router {
    Router::new()
        .route("/identity", get(identity))
        .route("/crawl", post(crawl))
        .route("/emails", get(emails))
        .with_state(service)
}

async fn identity(
    State(service): State<Arc<dyn WorkerService>>,
) -> Result<Json<IdentityReply>, ApiError> {
    let id = service.get_identity().await?;
    Ok(Json(IdentityReply { id }))
}

async fn crawl(
    State(service): State<Arc<dyn WorkerService>>,
    Json(call): Json<CrawlCall>,
) -> Result<Json<CrawlReply>, ApiError> {
    tracing::info!(
        "Crawl requested: {} for {} minute(s)",
        call.start_url,
        call.time_limit_minutes
    );
    // Detached so a caller that hangs up cannot cut the crawl short
    let task =
        tokio::spawn(async move { service.crawl(&call.start_url, call.time_limit_minutes).await });
    let page_count = task
        .await
        .map_err(|e| RemoteCallError::Worker(format!("crawl task failed: {}", e)))??;
    Ok(Json(CrawlReply { page_count }))
}

async fn emails(
    State(service): State<Arc<dyn WorkerService>>,
) -> Result<Json<Vec<EmailRecord>>, ApiError> {
    Ok(Json(service.get_emails().await?))
}

/// Routes exposing a [`Directory`]
pub fn directory_router(directory: Arc<dyn Directory>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/lookup", get(lookup))
        .with_state(directory)
}

async fn register(
    State(directory): State<Arc<dyn Directory>>,
    Json(entry): Json<DirectoryEntry>,
) -> Result<StatusCode, ApiError> {
    directory.register(&entry.name, entry.handle).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn lookup(
    State(directory): State<Arc<dyn Directory>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    Ok(Json(directory.lookup(&query.prefix).await?))
}

/// Serves `router` on `listener` until the process exits
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on {}", addr);
    }
    axum::serve(listener, router).await
}
