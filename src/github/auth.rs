// GitHub App authentication.
// Signs an app JWT and exchanges it for a short-lived installation token.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, Result};

use super::client::GitHubClient;

/// Short-lived installation access token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Source of the access token shared by every repository fetch in a batch.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<AccessToken>;
}

/// GitHub App credentials. Any of them may be absent until a token is requested.
#[derive(Clone, Default)]
pub struct AppCredentials {
    pub app_id: Option<String>,
    pub private_key_pem: Option<String>,
    pub installation_id: Option<String>,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key_pem", &self.private_key_pem.as_ref().map(|_| "***"))
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

/// JWT claims for GitHub App authentication.
#[derive(Debug, Serialize)]
struct AppClaims {
    /// Issued at, backdated for clock skew.
    iat: u64,
    exp: u64,
    /// GitHub App ID.
    iss: String,
}

/// Generate a ten minute RS256 JWT identifying the app.
pub fn generate_jwt(app_id: &str, private_key_pem: &[u8]) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Other(e.to_string()))?
        .as_secs();

    let claims = AppClaims {
        iat: now.saturating_sub(60),
        exp: now + 600,
        iss: app_id.to_string(),
    };

    let key = EncodingKey::from_rsa_pem(private_key_pem)?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

/// Token provider backed by the GitHub App installation token exchange.
pub struct GitHubAppTokenProvider {
    credentials: AppCredentials,
    api_base: String,
}

impl GitHubAppTokenProvider {
    pub fn new(credentials: AppCredentials, api_base: impl Into<String>) -> Self {
        Self {
            credentials,
            api_base: api_base.into(),
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingCredential(name))
}

#[async_trait]
impl TokenProvider for GitHubAppTokenProvider {
    async fn token(&self) -> Result<AccessToken> {
        let app_id = required(&self.credentials.app_id, "GITHUB_APP_ID")?;
        let key = required(&self.credentials.private_key_pem, "GITHUB_PRIVATE_KEY")?;
        let installation_id =
            required(&self.credentials.installation_id, "GITHUB_INSTALLATION_ID")?;

        let jwt = generate_jwt(app_id, key.as_bytes())?;
        let mut client = GitHubClient::new(&self.api_base, &jwt)?;
        let token = client
            .create_installation_token(installation_id)
            .await
            .map_err(|e| AppError::TokenExchange(e.to_string()))?;

        debug!(installation_id, expires_at = %token.expires_at, "obtained installation token");
        Ok(AccessToken::new(token.token))
    }
}
