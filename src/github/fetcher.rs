// Repository fetcher for dependency-bot pull requests.
// Lists open pulls for one repository and keeps the ones the bot authored.

use async_trait::async_trait;

use crate::error::Result;

use super::auth::AccessToken;
use super::client::GitHubClient;
use super::types::PullRequest;

/// Login of the dependency-update bot account.
pub const BOT_LOGIN: &str = "dependabot[bot]";

/// Fetches open bot pull requests for a single repository.
#[async_trait]
pub trait PullRequestFetcher: Send + Sync {
    async fn fetch_open_bot_prs(
        &self,
        token: &AccessToken,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>>;
}

/// Keep only pull requests authored by the bot.
pub fn filter_bot_pulls(pulls: Vec<PullRequest>) -> Vec<PullRequest> {
    pulls
        .into_iter()
        .filter(|pr| pr.author_login() == Some(BOT_LOGIN))
        .collect()
}

/// Fetcher that talks to the GitHub REST API.
pub struct GitHubPullFetcher {
    api_base: String,
}

impl GitHubPullFetcher {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl PullRequestFetcher for GitHubPullFetcher {
    async fn fetch_open_bot_prs(
        &self,
        token: &AccessToken,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>> {
        // Single page only; bot PR volume per repository is small.
        let mut client = GitHubClient::new(&self.api_base, token.as_str())?;
        let pulls = client.list_open_pulls(owner, repo).await?;
        Ok(filter_bot_pulls(pulls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pull(id: u64, login: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "number": id,
            "title": format!("PR {}", id),
            "html_url": format!("https://github.com/o/r/pull/{}", id),
            "state": "open",
            "user": { "id": 1, "login": login },
            "head": { "ref": "branch", "sha": "abc", "repo": null },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_filters_to_bot_author() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                pull(1, "dependabot[bot]"),
                pull(2, "octocat"),
                pull(3, "dependabot[bot]"),
            ])))
            .mount(&server)
            .await;

        let fetcher = GitHubPullFetcher::new(server.uri());
        let prs = fetcher
            .fetch_open_bot_prs(&AccessToken::new("t"), "o", "r")
            .await
            .unwrap();
        let ids: Vec<u64> = prs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_no_bot_pulls_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([pull(1, "octocat")])),
            )
            .mount(&server)
            .await;

        let fetcher = GitHubPullFetcher::new(server.uri());
        let prs = fetcher
            .fetch_open_bot_prs(&AccessToken::new("t"), "o", "r")
            .await
            .unwrap();
        assert!(prs.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_propagates() {
        let server = MockServer::start().await;
        let fetcher = GitHubPullFetcher::new(server.uri());
        let err = fetcher
            .fetch_open_bot_prs(&AccessToken::new("t"), "o", "missing")
            .await
            .unwrap_err();
        assert_eq!(err.code().as_deref(), Some("404"));
    }
}
