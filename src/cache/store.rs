// File-backed cache store.
// Keeps every entry in one JSON object, re-read and rewritten whole on each operation.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::Result;

/// Default TTL for aggregate results: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache key for an owner and an ordered repository list.
///
/// Order matters: the same repositories in a different order miss.
pub fn cache_key(owner: &str, repos: &[String]) -> String {
    format!("{}-{}", owner, repos.join(","))
}

/// One persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload.
    pub data: serde_json::Value,
    /// When the entry was written, in epoch milliseconds.
    pub timestamp: i64,
    /// Lifetime in milliseconds.
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(data: serde_json::Value, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
            ttl: ttl.as_millis() as u64,
        }
    }

    /// Check whether the entry is older than its TTL at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > i64::try_from(self.ttl).unwrap_or(i64::MAX)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

type Entries = BTreeMap<String, CacheEntry>;

/// Cache of aggregate results persisted to a single JSON file.
///
/// No state is held in memory. Concurrent writers are not coordinated; the
/// last write wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self {
            path: path.into(),
            default_ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a live entry, deleting it if it has expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.read_entries()?;
        let entry = entries.remove(key)?;

        if entry.is_expired() {
            debug!(key, "cache entry expired");
            if let Err(e) = self.write_entries(&entries) {
                warn!(key, error = %e, "failed to drop expired cache entry");
            }
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key, error = %e, "cache entry has unexpected shape");
                None
            }
        }
    }

    /// Store `data` under `key`, leaving other keys untouched.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(
            key.to_string(),
            CacheEntry::new(value, ttl.unwrap_or(self.default_ttl)),
        );
        if let Err(e) = self.write_entries(&entries) {
            warn!(key, error = %e, "failed to write cache");
        }
    }

    /// Remove one entry. Best effort.
    pub fn delete(&self, key: &str) {
        let Some(mut entries) = self.read_entries() else {
            return;
        };
        if entries.remove(key).is_some() {
            if let Err(e) = self.write_entries(&entries) {
                warn!(key, error = %e, "failed to delete cache entry");
            }
        }
    }

    /// Remove the whole backing file. Best effort.
    pub fn clear(&self) {
        if let Err(e) = self.try_clear() {
            warn!(error = %e, "failed to clear cache");
        }
    }

    /// Remove the whole backing file, reporting I/O failures.
    pub fn try_clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load all entries. Missing, unreadable, or corrupt files read as `None`.
    fn read_entries(&self) -> Option<Entries> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "cache unreadable");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(entries) => Some(entries),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "cache corrupt, ignoring");
                None
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique temp sibling of `path` for one write.
fn temp_path_for(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
}

/// Write a file via a temp sibling and rename, creating parent directories.
///
/// Each call writes its own temp file, so concurrent writers never share one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}
