// Multi-repository fetch aggregation.
// Fans out one fetch per repository and folds the outcomes into a single result.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::github::{PullRequestFetcher, TokenProvider};

use super::record::PullRequestRecord;

/// Message recorded when a repository task dies without a typed error.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// A repository that failed during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoError {
    pub repo: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl RepoError {
    pub fn from_error(repo: &str, err: &AppError) -> Self {
        Self {
            repo: repo.to_string(),
            error: err.to_string(),
            code: err.code(),
        }
    }

    pub fn unknown(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            error: UNKNOWN_ERROR.to_string(),
            code: None,
        }
    }
}

/// Aggregated bot pull requests plus the repositories that failed.
///
/// `count` is always `data.len()`; a stored count is ignored on deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredFetchAllResult")]
pub struct FetchAllResult {
    data: Vec<PullRequestRecord>,
    errors: Vec<RepoError>,
    count: usize,
}

#[derive(Deserialize)]
struct StoredFetchAllResult {
    data: Vec<PullRequestRecord>,
    #[serde(default)]
    errors: Vec<RepoError>,
}

impl From<StoredFetchAllResult> for FetchAllResult {
    fn from(stored: StoredFetchAllResult) -> Self {
        Self::new(stored.data, stored.errors)
    }
}

impl FetchAllResult {
    pub fn new(data: Vec<PullRequestRecord>, errors: Vec<RepoError>) -> Self {
        let count = data.len();
        Self {
            data,
            errors,
            count,
        }
    }

    pub fn data(&self) -> &[PullRequestRecord] {
        &self.data
    }

    pub fn errors(&self) -> &[RepoError] {
        &self.errors
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of repositories that failed.
    pub fn failed_repos(&self) -> usize {
        self.errors.len()
    }

    /// Number of queried repositories that did not fail.
    pub fn successful_repos(&self, total_repos: usize) -> usize {
        total_repos.saturating_sub(self.failed_repos())
    }
}

/// Fetches bot pull requests across many repositories with one shared token.
pub struct Aggregator {
    tokens: Arc<dyn TokenProvider>,
    fetcher: Arc<dyn PullRequestFetcher>,
}

impl Aggregator {
    pub fn new(tokens: Arc<dyn TokenProvider>, fetcher: Arc<dyn PullRequestFetcher>) -> Self {
        Self { tokens, fetcher }
    }

    /// Fetch every repository concurrently.
    ///
    /// Only a token failure fails the whole call; per-repository failures are
    /// reported in [`FetchAllResult::errors`] and never cancel sibling fetches.
    pub async fn fetch_all(&self, owner: &str, repos: &[String]) -> Result<FetchAllResult> {
        // No repositories means nothing to authenticate for.
        if repos.is_empty() {
            debug!(owner, "no repositories configured, skipping fetch");
            return Ok(FetchAllResult::default());
        }

        let token = self.tokens.token().await?;

        let tasks = repos.iter().map(|repo| {
            let fetcher = Arc::clone(&self.fetcher);
            let token = token.clone();
            let owner = owner.to_string();
            let repo = repo.clone();
            tokio::spawn(async move {
                let pulls = fetcher.fetch_open_bot_prs(&token, &owner, &repo).await?;
                Ok::<_, AppError>(
                    pulls
                        .iter()
                        .map(PullRequestRecord::from)
                        .collect::<Vec<_>>(),
                )
            })
        });
        let settled = join_all(tasks).await;

        let mut data = Vec::new();
        let mut errors = Vec::new();
        for (repo, outcome) in repos.iter().zip(settled) {
            match outcome {
                Ok(Ok(records)) => {
                    debug!(owner, repo = %repo, found = records.len(), "fetched repository");
                    data.extend(records);
                }
                Ok(Err(err)) => {
                    warn!(owner, repo = %repo, error = %err, "repository fetch failed");
                    errors.push(RepoError::from_error(repo, &err));
                }
                Err(join_err) => {
                    warn!(owner, repo = %repo, error = %join_err, "repository task aborted");
                    errors.push(RepoError::unknown(repo));
                }
            }
        }

        let result = FetchAllResult::new(data, errors);
        info!(
            owner,
            repos = repos.len(),
            prs = result.count(),
            failed = result.failed_repos(),
            "aggregate fetch complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::github::{AccessToken, PullRequest};

    /// Token provider that always succeeds or always fails.
    pub struct StaticTokens {
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl StaticTokens {
        pub fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TokenProvider for StaticTokens {
        async fn token(&self) -> Result<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::MissingCredential("GITHUB_APP_ID"))
            } else {
                Ok(AccessToken::new("test-token"))
            }
        }
    }

    /// Scripted per-repository outcomes.
    pub enum Script {
        Pulls(Vec<PullRequest>),
        Fail(String),
        Panic,
    }

    pub struct ScriptedFetcher {
        scripts: Mutex<HashMap<String, Script>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub fn new(scripts: Vec<(&str, Script)>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(
                    scripts
                        .into_iter()
                        .map(|(repo, s)| (repo.to_string(), s))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PullRequestFetcher for ScriptedFetcher {
        async fn fetch_open_bot_prs(
            &self,
            _token: &AccessToken,
            _owner: &str,
            repo: &str,
        ) -> Result<Vec<PullRequest>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match self.scripts.lock().unwrap().get(repo) {
                Some(Script::Pulls(pulls)) => Some(Ok(pulls.clone())),
                Some(Script::Fail(message)) => Some(Err(AppError::Other(message.clone()))),
                Some(Script::Panic) => None,
                None => Some(Ok(Vec::new())),
            };
            match outcome {
                Some(outcome) => outcome,
                None => panic!("scripted panic for {}", repo),
            }
        }
    }

    pub fn bot_pull(id: u64, title: &str, repo: &str) -> PullRequest {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "number": id,
            "title": title,
            "html_url": format!("https://github.com/o/{}/pull/{}", repo, id),
            "state": "open",
            "user": { "id": 1, "login": "dependabot[bot]" },
            "head": {
                "ref": "dependabot/npm/x",
                "sha": "abc",
                "repo": { "id": 1, "name": repo, "full_name": format!("o/{}", repo) }
            },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        }))
        .unwrap()
    }
}
