// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserType {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Unknown,
}

/// GitHub user, organization, or bot account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    #[serde(rename = "type", default)]
    pub user_type: UserType,
}

/// Repository summary embedded in a pull request branch reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRef {
    pub id: u64,
    pub name: String,
    pub full_name: String,
}

/// Branch reference on either side of a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    /// Missing when the source fork has been deleted.
    pub repo: Option<RepoRef>,
}

/// GitHub pull request as returned by the pulls list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    pub user: Option<User>,
    pub head: Option<BranchRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    /// Login of the author, if GitHub reported one.
    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

/// Response from the installation access token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: Option<u64>,
    pub reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_without_head_repo() {
        let json = serde_json::json!({
            "id": 7,
            "number": 3,
            "title": "Bump serde",
            "html_url": "https://github.com/o/r/pull/3",
            "state": "open",
            "user": { "id": 1, "login": "dependabot[bot]", "type": "Bot" },
            "head": { "ref": "dependabot/cargo/serde", "sha": "abc", "repo": null },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        });

        let pr: PullRequest = serde_json::from_value(json).unwrap();
        assert_eq!(pr.author_login(), Some("dependabot[bot]"));
        assert_eq!(pr.user.unwrap().user_type, UserType::Bot);
        assert!(pr.head.unwrap().repo.is_none());
        assert!(!pr.draft);
    }
}
