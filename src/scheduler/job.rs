// The scheduled aggregate fetch.
// One retried fetch_all run dispatched to the configured outcome handler.

use std::sync::Arc;

use crate::error::AppError;
use crate::prs::{Aggregator, FetchAllResult, RetryHandler, RetryPolicy, run_with_retry};

pub type RunHandler = dyn RetryHandler<FetchAllResult, AppError> + Send + Sync;

/// Retried aggregate fetch for a fixed owner and repository list.
pub struct ScheduledJob {
    aggregator: Arc<Aggregator>,
    owner: String,
    repos: Vec<String>,
    retry: RetryPolicy,
    handler: Arc<RunHandler>,
}

impl ScheduledJob {
    pub fn new(
        aggregator: Arc<Aggregator>,
        owner: impl Into<String>,
        repos: Vec<String>,
        retry: RetryPolicy,
        handler: Arc<RunHandler>,
    ) -> Self {
        Self {
            aggregator,
            owner: owner.into(),
            repos,
            retry,
            handler,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repos(&self) -> &[String] {
        &self.repos
    }

    /// Run to completion. `None` means every attempt failed and the handler was told.
    pub async fn run(&self) -> Option<FetchAllResult> {
        run_with_retry(
            self.retry,
            || self.aggregator.fetch_all(&self.owner, &self.repos),
            self.handler.as_ref(),
        )
        .await
    }
}
