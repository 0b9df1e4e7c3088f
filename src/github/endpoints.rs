// GitHub API endpoint functions.
// Provides typed methods for the pulls and app installation endpoints.

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{InstallationToken, PullRequest};

impl GitHubClient {
    /// List open pull requests for a repository (first page only).
    pub async fn list_open_pulls(&mut self, owner: &str, repo: &str) -> Result<Vec<PullRequest>> {
        let params = [("state", "open")];
        let response = self
            .get_with_params(&format!("/repos/{}/{}/pulls", owner, repo), &params)
            .await?;
        let pulls: Vec<PullRequest> = response.json().await?;
        Ok(pulls)
    }

    /// Exchange the app JWT this client was built with for an installation token.
    pub async fn create_installation_token(
        &mut self,
        installation_id: &str,
    ) -> Result<InstallationToken> {
        let response = self
            .post(&format!(
                "/app/installations/{}/access_tokens",
                installation_id
            ))
            .await?;
        let token: InstallationToken = response.json().await?;
        Ok(token)
    }
}
