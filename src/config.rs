// Process configuration.
// Command line flags with environment fallbacks, resolved once at startup.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::cache::default_cache_path;
use crate::error::Result;
use crate::github::{AppCredentials, GITHUB_API_BASE};
use crate::prs::RetryPolicy;
use crate::scheduler::{DEFAULT_SCHEDULE, SchedulerConfig};

/// Aggregates open dependency-bot pull requests across GitHub repositories.
#[derive(Parser, Debug)]
#[command(name = "depbot-prs", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (and the scheduler when enabled). Default.
    Serve,
    /// Run one retried aggregate fetch and print it as JSON.
    Fetch,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<String>,

    /// GitHub App private key (PEM)
    #[arg(long, env = "GITHUB_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Path to the GitHub App private key, used when the key itself is not set
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    pub private_key_path: Option<PathBuf>,

    /// GitHub App installation ID
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    pub installation_id: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_BASE)]
    pub api_url: String,

    /// Repository owner (user or organization)
    #[arg(long, env = "GITHUB_OWNER", default_value = "dependabot")]
    pub owner: String,

    /// Comma separated repository names
    #[arg(long, env = "GITHUB_REPOS", default_value = "")]
    pub repos: String,

    /// Cache entry lifetime in milliseconds
    #[arg(long, env = "CACHE_TTL_MS", default_value_t = 300_000)]
    pub cache_ttl_ms: u64,

    /// Cache file location
    #[arg(long, env = "CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Enable the scheduled batch job
    #[arg(
        long,
        env = "SCHEDULE_ENABLED",
        action = ArgAction::Set,
        value_parser = FalseyValueParser::new(),
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub schedule_enabled: bool,

    /// Cron expression for the batch job (5 or 6 fields, UTC)
    #[arg(long = "cron", env = "CRON_SCHEDULE", default_value = DEFAULT_SCHEDULE)]
    pub cron: String,

    /// Run the batch job once at startup as well
    #[arg(
        long,
        env = "SCHEDULE_RUN_ON_START",
        action = ArgAction::Set,
        value_parser = FalseyValueParser::new(),
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub run_on_start: bool,

    /// Attempts per batch run
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Delay between failed attempts in milliseconds
    #[arg(long, env = "RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Where each successful batch run writes its snapshot
    #[arg(long, env = "OUTPUT_FILE")]
    pub output_file: Option<PathBuf>,

    /// JSON array that failed batch runs are appended to
    #[arg(long, env = "ERROR_LOG_FILE")]
    pub error_log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(
        long,
        env = "LOG_JSON",
        action = ArgAction::Set,
        value_parser = FalseyValueParser::new(),
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub log_json: bool,
}

/// Split a comma separated repository list, dropping blanks.
pub fn parse_repo_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    pub fn repo_list(&self) -> Vec<String> {
        parse_repo_list(&self.repos)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(default_cache_path)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Collect app credentials, reading the key file when only a path is given.
    pub fn credentials(&self) -> Result<AppCredentials> {
        let private_key_pem = match (&self.private_key, &self.private_key_path) {
            (Some(key), _) => Some(key.replace("\\n", "\n")),
            (None, Some(path)) => Some(fs::read_to_string(path)?),
            (None, None) => None,
        };

        Ok(AppCredentials {
            app_id: self.app_id.clone(),
            private_key_pem,
            installation_id: self.installation_id.clone(),
        })
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            owner: self.owner.clone(),
            repos: self.repo_list(),
            cron: self.cron.clone(),
            retry: self.retry_policy(),
            output_file: self.output_file.clone(),
            error_log_file: self.error_log_file.clone(),
            warm_cache: true,
            run_on_start: self.run_on_start,
        }
    }
}
