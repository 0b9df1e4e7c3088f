// Display records for bot pull requests.
// Maps raw GitHub pull requests to the minimal shape served to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::PullRequest;

/// Minimal pull request record returned by the API and scheduler output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRecord {
    pub id: u64,
    pub title: String,
    pub url: String,
    /// Head repository name, empty when GitHub omitted it.
    pub repo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PullRequest> for PullRequestRecord {
    fn from(pr: &PullRequest) -> Self {
        Self {
            id: pr.id,
            title: pr.title.clone(),
            url: pr.html_url.clone(),
            repo: pr
                .head
                .as_ref()
                .and_then(|h| h.repo.as_ref())
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            created_at: pr.created_at,
            updated_at: pr.updated_at,
        }
    }
}

impl From<PullRequest> for PullRequestRecord {
    fn from(pr: PullRequest) -> Self {
        Self::from(&pr)
    }
}
