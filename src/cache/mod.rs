// Cache module for aggregate results.
// A TTL-bounded key/value store persisted as one JSON file.

pub mod paths;
pub mod store;

pub use paths::default_cache_path;
pub use store::{CacheEntry, CacheStore, DEFAULT_TTL, cache_key, write_atomic};
