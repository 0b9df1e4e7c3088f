// HTTP route handlers.
// Serves the aggregated bot pull requests and cache management.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, cache_key};
use crate::error::{AppError, Result};
use crate::config::parse_repo_list;
use crate::prs::{Aggregator, FetchAllResult, PullRequestRecord, RepoError};

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub cache: CacheStore,
    pub owner: String,
    pub repos: Arc<Vec<String>>,
}

/// Optional overrides for `GET /api/prs`.
#[derive(Debug, Default, Deserialize)]
pub struct PrsQuery {
    pub owner: Option<String>,
    /// Comma separated repository names.
    pub repos: Option<String>,
    /// Skip the cache read.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    pub total_repos_queried: usize,
    pub successful_repos: usize,
    pub failed_repos: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrsResponse {
    pub data: Vec<PullRequestRecord>,
    pub errors: Vec<RepoError>,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
    pub from_cache: bool,
    pub summary: QuerySummary,
}

impl PrsResponse {
    fn new(result: FetchAllResult, total_repos: usize, from_cache: bool) -> Self {
        let summary = QuerySummary {
            total_repos_queried: total_repos,
            successful_repos: result.successful_repos(total_repos),
            failed_repos: result.failed_repos(),
        };
        Self {
            count: result.count(),
            data: result.data().to_vec(),
            errors: result.errors().to_vec(),
            generated_at: Utc::now(),
            from_cache,
            summary,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorMessage,
    pub generated_at: DateTime<Utc>,
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: ErrorMessage { message },
            generated_at: Utc::now(),
        }),
    )
        .into_response()
}

/// Run cache file I/O off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Other(format!("blocking task failed: {}", e)))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "depbot-prs",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /api/prs`: cached or live aggregate of open bot pull requests.
pub async fn list_prs(State(state): State<AppState>, Query(query): Query<PrsQuery>) -> Response {
    let owner = query
        .owner
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| state.owner.clone());
    let repos = match query.repos.as_deref() {
        Some(list) => parse_repo_list(list),
        None => state.repos.as_ref().clone(),
    };
    let key = cache_key(&owner, &repos);

    if !query.refresh {
        let cache = state.cache.clone();
        let lookup = key.clone();
        let cached = blocking(move || cache.get::<FetchAllResult>(&lookup))
            .await
            .unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "cache read task failed");
                None
            });
        if let Some(cached) = cached {
            debug!(key = %key, "serving from cache");
            return Json(PrsResponse::new(cached, repos.len(), true)).into_response();
        }
    }

    match state.aggregator.fetch_all(&owner, &repos).await {
        Ok(result) => {
            let cache = state.cache.clone();
            let stored = result.clone();
            if let Err(e) = blocking(move || cache.set(&key, &stored, None)).await {
                warn!(error = %e, "cache write task failed");
            }
            Json(PrsResponse::new(result, repos.len(), false)).into_response()
        }
        Err(e) => {
            error!(owner = %owner, error = %e, "aggregate fetch failed");
            error_response(e.to_string())
        }
    }
}

/// `DELETE /api/cache`: drop every cached aggregate.
pub async fn clear_cache(State(state): State<AppState>) -> Response {
    let cache = state.cache.clone();
    match blocking(move || cache.try_clear()).await.and_then(|r| r) {
        Ok(()) => {
            info!(path = %state.cache.path().display(), "cache cleared");
            Json(serde_json::json!({
                "message": "Cache cleared",
                "timestamp": Utc::now(),
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to clear cache");
            error_response(e.to_string())
        }
    }
}
