// GitHub API module.
// Provides the client, app authentication, and the bot pull request fetcher.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod fetcher;
pub mod types;

pub use auth::{AccessToken, AppCredentials, GitHubAppTokenProvider, TokenProvider};
pub use client::{GITHUB_API_BASE, GitHubClient};
pub use fetcher::{BOT_LOGIN, GitHubPullFetcher, PullRequestFetcher};
pub use types::*;
