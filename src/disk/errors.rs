//! Access layer error types
//!
//! Typed failures for resolving public resources and populating the download cache.
//! Remote failures keep the HTTP status so callers can decide whether to retry.

use std::path::PathBuf;

/// Maximum number of response body bytes kept in a rejection message
const MAX_MESSAGE_LEN: usize = 256;

/// Errors surfaced by the resolver and the download cache
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote rejected request (HTTP {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to write cache file {path:?}: {source}")]
    CacheWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read cache file {path:?}: {source}")]
    CacheReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AccessError {
    /// Whether a caller may reasonably retry the same request
    ///
    /// The access layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            AccessError::RemoteUnavailable(_) => true,
            AccessError::RemoteRejected { status, .. } => {
                matches!(status, 408 | 429 | 500..=599)
            }
            _ => false,
        }
    }

    /// Create an error from a non-success HTTP status and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        let mut message = body.trim().to_string();
        if message.len() > MAX_MESSAGE_LEN {
            let mut end = MAX_MESSAGE_LEN;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        AccessError::RemoteRejected { status, message }
    }

    /// Map a transport-level reqwest failure
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AccessError::RemoteUnavailable(format!("request timed out: {}", err))
        } else {
            AccessError::RemoteUnavailable(err.to_string())
        }
    }

    pub(crate) fn cache_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AccessError::CacheWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn cache_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AccessError::CacheReadFailed {
            path: path.into(),
            source,
        }
    }
}
