// Error types for the depbot-prs service.
// Covers GitHub API failures, app authentication, scheduling, and file I/O.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Missing GitHub App credential: {0}")]
    MissingCredential(&'static str),

    #[error("Failed to sign app JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Installation token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid cron schedule: {0}")]
    InvalidSchedule(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Short classification recorded alongside a per-repository failure.
    pub fn code(&self) -> Option<String> {
        match self {
            AppError::Api(e) => e.status().map(|s| s.as_u16().to_string()),
            AppError::Unauthorized => Some("401".to_string()),
            AppError::NotFound(_) => Some("404".to_string()),
            AppError::Forbidden(_) | AppError::RateLimited { .. } => Some("403".to_string()),
            AppError::Status { status, .. } => Some(status.to_string()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_for_http_failures() {
        assert_eq!(AppError::Unauthorized.code().as_deref(), Some("401"));
        assert_eq!(
            AppError::NotFound("x".into()).code().as_deref(),
            Some("404")
        );
        assert_eq!(
            AppError::Status {
                status: 502,
                body: String::new()
            }
            .code()
            .as_deref(),
            Some("502")
        );
        assert_eq!(AppError::Other("boom".into()).code(), None);
    }

    #[test]
    fn test_forbidden_message() {
        let err = AppError::Forbidden("insufficient permissions".into());
        assert_eq!(err.to_string(), "Forbidden: insufficient permissions");
    }
}
