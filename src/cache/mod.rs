//! Download caching layer
//!
//! Persists fetched remote files under a single cache root, keyed by validated filename.

pub mod file_cache;
pub mod key;

pub use file_cache::{CacheOutcome, CachedFile, DownloadCache, STALE_PARTIAL_AGE};
pub use key::CacheKey;
