//! Public disk access layer
//!
//! Resolves public resource keys to file listings through the remote API and serves
//! individual files through a write-through local download cache.

pub mod cache;
pub mod config;
pub mod disk;

pub use cache::{CacheKey, CacheOutcome, CachedFile, DownloadCache, STALE_PARTIAL_AGE};
pub use config::AccessConfig;
pub use disk::{AccessError, FileEntry, PublicDiskClient, PublicKey};
