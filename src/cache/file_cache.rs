//! Local Download Cache
//!
//! Serves remote files from a local cache root, downloading them on first request.
//! Entries are trusted once written: there is no TTL and no comparison against the
//! remote copy, and nothing here evicts them.
//!
//! A download is streamed into a hidden `.part` file inside the cache root and only
//! moved to its final name once the whole body is on disk. The final path therefore
//! never holds a truncated file. Dropping a [`DownloadCache::fetch`] future removes
//! its temporary file. Several caches, in one process or many, may share a root.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use reqwest::{Response, Url};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::key::{is_partial_name, CacheKey, PARTIAL_SUFFIX};
use crate::config::AccessConfig;
use crate::disk::{AccessError, PublicDiskClient};

/// Age after which a `.part` file with no writes is treated as abandoned
///
/// A running download touches its temporary file with every body chunk, so only
/// transfers stalled for this long, or left by a dead process, qualify.
pub const STALE_PARTIAL_AGE: Duration = Duration::from_secs(60 * 60);

/// Where a [`CachedFile`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from an existing entry, no remote call made
    Hit,
    /// Downloaded and persisted by this call (or by a concurrent one)
    Miss,
}

/// Open handle to a finalized cache entry
#[derive(Debug)]
pub struct CachedFile {
    key: CacheKey,
    path: PathBuf,
    size: u64,
    outcome: CacheOutcome,
    file: File,
}

impl CachedFile {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Final path of the entry inside the cache root
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes at the time the entry was opened
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn outcome(&self) -> CacheOutcome {
        self.outcome
    }

    /// Take the underlying file, positioned at the start
    pub fn into_file(self) -> File {
        self.file
    }

    /// Read the whole entry into memory
    pub async fn read_to_end(mut self) -> Result<Vec<u8>, AccessError> {
        let mut buf = Vec::with_capacity(self.size as usize);
        self.file
            .read_to_end(&mut buf)
            .await
            .map_err(|e| AccessError::cache_read(&self.path, e))?;
        Ok(buf)
    }
}

/// Write-through download cache rooted at a single directory
pub struct DownloadCache {
    /// Root directory for cached files
    cache_root: PathBuf,
    /// Client used for cache misses
    client: PublicDiskClient,
}

impl DownloadCache {
    /// Create a cache rooted at `cache_root`
    ///
    /// The directory is created on the first cache miss. Nothing on disk is
    /// touched here; see [`DownloadCache::cleanup`] for removing leftovers.
    pub fn new(cache_root: impl Into<PathBuf>, client: PublicDiskClient) -> Self {
        let cache_root = cache_root.into();
        info!(cache_root = %cache_root.display(), "Download cache initialized");

        Self { cache_root, client }
    }

    /// Create a cache rooted at the configured cache directory
    pub fn from_config(config: &AccessConfig, client: PublicDiskClient) -> Self {
        Self::new(config.cache_root.clone(), client)
    }

    /// Get the cache root path
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Return the bytes for `filename`, downloading from `remote_url` on a miss
    ///
    /// The filename is validated before anything else; an unsafe name never
    /// reaches the network or the filesystem. On a hit the remote is not
    /// contacted at all.
    pub async fn fetch(&self, remote_url: &str, filename: &str) -> Result<CachedFile, AccessError> {
        let key = CacheKey::new(filename)?;
        let url = parse_remote_url(remote_url)?;
        let local_path = key.path_in(&self.cache_root);

        if let Some(cached) = self.open_entry(&key, &local_path, CacheOutcome::Hit).await? {
            debug!(file = %key, size = cached.size, "Download cache HIT");
            return Ok(cached);
        }

        debug!(file = %key, url = %url, "Download cache MISS, fetching");

        let response = self.client.open_download(url).await?;
        self.populate(&key, &local_path, response).await?;

        match self.open_entry(&key, &local_path, CacheOutcome::Miss).await? {
            Some(cached) => Ok(cached),
            None => Err(AccessError::cache_read(
                &local_path,
                io::Error::new(ErrorKind::NotFound, "cache entry missing after write"),
            )),
        }
    }

    /// Check whether a finalized entry exists for `filename`
    pub async fn contains(&self, filename: &str) -> Result<bool, AccessError> {
        let key = CacheKey::new(filename)?;
        let local_path = key.path_in(&self.cache_root);
        match tokio::fs::metadata(&local_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(AccessError::cache_read(local_path, e)),
        }
    }

    /// Open an existing entry, `None` if there is none
    async fn open_entry(
        &self,
        key: &CacheKey,
        local_path: &Path,
        outcome: CacheOutcome,
    ) -> Result<Option<CachedFile>, AccessError> {
        let file = match File::open(local_path).await {
            Ok(file) => file,
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(AccessError::cache_read(local_path, e)),
        };

        let metadata = file
            .metadata()
            .await
            .map_err(|e| AccessError::cache_read(local_path, e))?;
        if !metadata.is_file() {
            return Err(AccessError::cache_read(
                local_path,
                io::Error::new(ErrorKind::Other, "cache entry is not a regular file"),
            ));
        }

        Ok(Some(CachedFile {
            key: key.clone(),
            path: local_path.to_path_buf(),
            size: metadata.len(),
            outcome,
            file,
        }))
    }

    /// Stream the response body into a temporary file and move it into place
    async fn populate(
        &self,
        key: &CacheKey,
        local_path: &Path,
        response: Response,
    ) -> Result<(), AccessError> {
        tokio::fs::create_dir_all(&self.cache_root)
            .await
            .map_err(|e| AccessError::cache_write(&self.cache_root, e))?;

        let root = self.cache_root.clone();
        let tmp = run_blocking(move || {
            tempfile::Builder::new()
                .prefix(".")
                .suffix(PARTIAL_SUFFIX)
                .tempfile_in(&root)
        })
        .await
        .map_err(|e| AccessError::cache_write(&self.cache_root, e))?;
        let (std_file, temp_path) = tmp.into_parts();
        let file = File::from_std(std_file);

        let written = match copy_body(response, file, &temp_path).await {
            Ok(written) => written,
            Err(e) => {
                warn!(file = %key, error = %e, "Download failed, discarding partial file");
                if let Err(close_err) = run_blocking(move || temp_path.close()).await {
                    warn!(file = %key, error = %close_err, "Failed to remove partial file");
                }
                return Err(e);
            }
        };

        // A failed persist hands the temp path back; dropping it removes the file
        let dest = local_path.to_path_buf();
        let persisted =
            run_blocking(move || temp_path.persist_noclobber(&dest).map_err(|e| e.error)).await;

        match persisted {
            Ok(()) => {
                info!(
                    file = %key,
                    local = %local_path.display(),
                    size = written,
                    "Stored download in cache"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Another download of the same key finished first; its copy wins
                debug!(file = %key, "Cache entry already finalized, discarding duplicate download");
                Ok(())
            }
            Err(e) => Err(AccessError::cache_write(local_path, e)),
        }
    }

    /// Remove temporary files left behind by interrupted downloads
    ///
    /// Only `.part` files last written at least `min_age` ago are removed, so
    /// downloads in progress in this or another process keep their files. Pass
    /// [`STALE_PARTIAL_AGE`] unless the root is known to be idle. A missing root
    /// counts as clean. Returns the number of files removed.
    pub async fn cleanup(&self, min_age: Duration) -> Result<usize, AccessError> {
        let root = self.cache_root.clone();
        let removed = run_blocking(move || sweep_partials(&root, min_age))
            .await
            .map_err(|e| AccessError::cache_read(&self.cache_root, e))?;

        info!(
            cache_root = %self.cache_root.display(),
            removed,
            "Swept stale partial files"
        );
        Ok(removed)
    }
}

fn sweep_partials(root: &Path, min_age: Duration) -> io::Result<usize> {
    let read_dir = match fs::read_dir(root) {
        Ok(read_dir) => read_dir,
        Err(e) if is_missing(&e) => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in read_dir.flatten() {
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_partial_name) {
            continue;
        }
        let path = entry.path();

        // Future mtimes count as age zero
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| now.duration_since(modified).unwrap_or_default());
        match age {
            Ok(age) if age >= min_age => {}
            Ok(age) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "Keeping recent partial file");
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat partial file");
                continue;
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale partial file");
                removed += 1;
            }
            // Finalized or discarded by its writer in the meantime
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove stale partial file")
            }
        }
    }
    Ok(removed)
}

/// Run filesystem work on tokio's blocking pool
async fn run_blocking<T, F>(work: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(io::Error::new(ErrorKind::Other, e)),
    }
}

/// Copy a response body to `file` chunk by chunk, then flush it to disk
///
/// Each chunk is written as received. Peak memory is one transport read buffer,
/// independent of the body size.
async fn copy_body(
    mut response: Response,
    mut file: File,
    temp_path: &TempPath,
) -> Result<u64, AccessError> {
    let write_err = |e: io::Error| AccessError::cache_write(temp_path.to_path_buf(), e);

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(AccessError::from_transport)?
    {
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;
    Ok(written)
}

fn parse_remote_url(raw: &str) -> Result<Url, AccessError> {
    let url = Url::parse(raw)
        .map_err(|e| AccessError::InvalidInput(format!("invalid remote URL {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AccessError::InvalidInput(format!(
            "unsupported URL scheme {:?}",
            other
        ))),
    }
}

/// Errors that mean "no entry here" rather than a broken cache
fn is_missing(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}
