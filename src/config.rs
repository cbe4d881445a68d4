//! Runtime configuration for the access layer

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Public resources listing endpoint
pub const DEFAULT_LISTING_URL: &str = "https://cloud-api.yandex.net/v1/disk/public/resources";

/// User agent sent with every remote request
pub const DEFAULT_USER_AGENT: &str = concat!("public-disk-access/", env!("CARGO_PKG_VERSION"));

/// Configuration shared by the resolver and the download cache
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Listing endpoint queried with `?public_key=...`
    pub listing_url: String,
    /// Root directory for cached downloads
    pub cache_root: PathBuf,
    /// Per-request timeout; none by default, callers may impose one
    pub request_timeout: Option<Duration>,
    /// Optional page size forwarded as the `limit` query parameter
    pub listing_limit: Option<u32>,
    /// User agent header value
    pub user_agent: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            cache_root: default_cache_root(),
            request_timeout: None,
            listing_limit: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AccessConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `PUBLIC_DISK_LISTING_URL` | Listing endpoint |
    /// | `PUBLIC_DISK_CACHE_DIR` | Cache root directory |
    /// | `PUBLIC_DISK_TIMEOUT_SECS` | Per-request timeout in seconds |
    /// | `PUBLIC_DISK_LISTING_LIMIT` | Listing page size |
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("PUBLIC_DISK_LISTING_URL") {
            config.listing_url = url;
        }
        if let Ok(dir) = std::env::var("PUBLIC_DISK_CACHE_DIR") {
            config.cache_root = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("PUBLIC_DISK_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid PUBLIC_DISK_TIMEOUT_SECS: {:?}", secs))?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Ok(limit) = std::env::var("PUBLIC_DISK_LISTING_LIMIT") {
            let limit: u32 = limit
                .parse()
                .with_context(|| format!("Invalid PUBLIC_DISK_LISTING_LIMIT: {:?}", limit))?;
            config.listing_limit = Some(limit);
        }

        Ok(config)
    }

    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_listing_limit(mut self, limit: u32) -> Self {
        self.listing_limit = Some(limit);
        self
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("public-disk")
}
