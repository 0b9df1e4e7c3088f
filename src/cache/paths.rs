// Cache path utilities.
// Resolves where the cache file lives when no explicit path is configured.

use std::path::PathBuf;

use directories::ProjectDirs;

/// Get the base cache directory (~/.cache/depbot-prs on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "depbot-prs").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the aggregate result cache file.
pub fn default_cache_path() -> PathBuf {
    cache_dir()
        .map(|dir| dir.join("cache.json"))
        .unwrap_or_else(|| PathBuf::from(".cache").join("depbot-prs.json"))
}
