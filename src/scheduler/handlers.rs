// Outcome handlers for scheduled runs.
// Warm the cache, persist the snapshot file, and append failures to an error log.

use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cache::{CacheStore, write_atomic};
use crate::error::{AppError, Result};
use crate::prs::{FetchAllResult, PullRequestRecord, RepoError, RetryHandler};

/// Summary block of the scheduler output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(rename = "totalPRs")]
    pub total_prs: usize,
    pub successful_repos: usize,
    pub failed_repos: usize,
    pub errors: Vec<RepoError>,
}

/// Document written to the output file after each successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub generated_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub data: Vec<PullRequestRecord>,
}

impl RunSnapshot {
    pub fn new(result: &FetchAllResult, total_repos: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            summary: RunSummary {
                total_prs: result.count(),
                successful_repos: result.successful_repos(total_repos),
                failed_repos: result.failed_repos(),
                errors: result.errors().to_vec(),
            },
            data: result.data().to_vec(),
        }
    }
}

/// One entry of the error log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub error: String,
    pub stack: String,
}

impl ErrorLogEntry {
    pub fn new(err: &AppError) -> Self {
        Self {
            timestamp: Utc::now(),
            error: err.to_string(),
            stack: error_chain(err),
        }
    }
}

/// Render an error and its sources, one per line.
fn error_chain(err: &dyn StdError) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}

/// Write the snapshot file, replacing the previous run's file.
pub fn write_snapshot(path: &Path, snapshot: &RunSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    write_atomic(path, json.as_bytes())
}

/// Append an entry to the JSON array at `path`. Missing or corrupt logs start fresh.
pub fn append_error_log(path: &Path, entry: ErrorLogEntry) -> Result<()> {
    let mut entries: Vec<ErrorLogEntry> = fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or_default();
    entries.push(entry);

    let json = serde_json::to_string_pretty(&entries)?;
    write_atomic(path, json.as_bytes())
}

/// Handler wired to the scheduled job's retry wrapper.
#[derive(Debug, Clone, Default)]
pub struct ScheduledRunHandler {
    /// Cache and key to warm after a successful run.
    pub warm_cache: Option<(CacheStore, String)>,
    pub output_file: Option<PathBuf>,
    pub error_log_file: Option<PathBuf>,
    pub total_repos: usize,
}

impl RetryHandler<FetchAllResult, AppError> for ScheduledRunHandler {
    fn on_success(&self, result: &FetchAllResult) {
        info!(
            prs = result.count(),
            failed = result.failed_repos(),
            "scheduled run succeeded"
        );

        if let Some((cache, key)) = &self.warm_cache {
            cache.set(key, result, None);
        }

        if let Some(path) = &self.output_file {
            let snapshot = RunSnapshot::new(result, self.total_repos);
            match write_snapshot(path, &snapshot) {
                Ok(()) => info!(path = %path.display(), "wrote scheduled run output"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to write output file"),
            }
        }
    }

    fn on_error(&self, err: &AppError) {
        match &self.error_log_file {
            Some(path) => {
                if let Err(e) = append_error_log(path, ErrorLogEntry::new(err)) {
                    warn!(path = %path.display(), error = %e, "failed to append error log");
                }
                error!(error = %err, "scheduled run failed");
            }
            None => error!(error = %err, "scheduled run failed after all retries"),
        }
    }
}
