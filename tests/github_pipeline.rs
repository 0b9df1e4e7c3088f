// End-to-end aggregation against a mocked GitHub API.
// Exercises the app token exchange, the pulls endpoint, and the bot filter together.

use std::sync::Arc;

use depbot_prs::github::{AppCredentials, GitHubAppTokenProvider, GitHubPullFetcher};
use depbot_prs::prs::Aggregator;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!("fixtures/test_key.pem");

fn pull(id: u64, title: &str, repo: &str, login: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "number": id,
        "title": title,
        "html_url": format!("https://github.com/acme/{}/pull/{}", repo, id),
        "state": "open",
        "user": { "id": 49699333, "login": login, "type": "Bot" },
        "head": {
            "ref": "dependabot/cargo/serde-1.0.200",
            "sha": "0123abcd",
            "repo": { "id": 1, "name": repo, "full_name": format!("acme/{}", repo) }
        },
        "created_at": "2024-06-01T12:00:00Z",
        "updated_at": "2024-06-02T12:00:00Z"
    })
}

fn aggregator(server: &MockServer) -> Aggregator {
    let credentials = AppCredentials {
        app_id: Some("1001".to_string()),
        private_key_pem: Some(TEST_KEY.to_string()),
        installation_id: Some("2002".to_string()),
    };
    Aggregator::new(
        Arc::new(GitHubAppTokenProvider::new(credentials, server.uri())),
        Arc::new(GitHubPullFetcher::new(server.uri())),
    )
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/app/installations/2002/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_pipeline",
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partial_failure_across_repositories() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/repo1/pulls"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({ "message": "insufficient permissions" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/repo2/pulls"))
        .and(header("authorization", "Bearer ghs_pipeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            pull(2, "Repo2 PR", "repo2", "dependabot[bot]"),
            pull(3, "Human PR", "repo2", "octocat"),
        ])))
        .mount(&server)
        .await;

    let repos = vec!["repo1".to_string(), "repo2".to_string()];
    let result = aggregator(&server).fetch_all("acme", &repos).await.unwrap();

    assert_eq!(result.count(), 1);
    assert_eq!(result.data()[0].id, 2);
    assert_eq!(result.data()[0].title, "Repo2 PR");
    assert_eq!(result.data()[0].repo, "repo2");
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].repo, "repo1");
    assert_eq!(
        result.errors()[0].error,
        "Forbidden: insufficient permissions"
    );
    assert_eq!(result.errors()[0].code.as_deref(), Some("403"));
}

#[tokio::test]
async fn test_failed_token_exchange_fails_the_whole_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/2002/access_tokens"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let repos = vec!["repo1".to_string()];
    let err = aggregator(&server)
        .fetch_all("acme", &repos)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Installation token exchange failed"));
}
