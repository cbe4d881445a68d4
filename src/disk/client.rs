//! Public Disk API Client
//!
//! Resolves public keys to file listings and opens streaming downloads for
//! per-file URLs. Unauthenticated; every failure is surfaced without retrying.

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::errors::AccessError;
use super::types::{entries_from_listing, FileEntry, PublicKey};
use crate::config::AccessConfig;

/// Client for the public resources API
#[derive(Clone)]
pub struct PublicDiskClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Listing endpoint
    listing_url: Url,
    /// Optional page size for listings
    listing_limit: Option<u32>,
}

impl PublicDiskClient {
    /// Build a client from configuration
    ///
    /// A request timeout is only applied when the configuration sets one.
    pub fn new(config: &AccessConfig) -> Result<Self> {
        let listing_url = Url::parse(&config.listing_url)
            .with_context(|| format!("Invalid listing URL: {}", config.listing_url))?;

        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("Failed to create HTTP client")?;

        debug!(listing_url = %listing_url, timeout = ?config.request_timeout, "Public disk client ready");

        Ok(Self {
            http_client,
            listing_url,
            listing_limit: config.listing_limit,
        })
    }

    /// List the file entries of a public resource
    ///
    /// Issues a single GET against the listing endpoint. Entries come back in the
    /// order the remote reports them; absent `_embedded.items` yields an empty list.
    pub async fn resolve(&self, public_key: &PublicKey) -> Result<Vec<FileEntry>, AccessError> {
        let mut request = self
            .http_client
            .get(self.listing_url.clone())
            .query(&[("public_key", public_key.as_str())]);
        if let Some(limit) = self.listing_limit {
            request = request.query(&[("limit", limit)]);
        }

        debug!(public_key = %public_key, limit = ?self.listing_limit, "Requesting public resource listing");

        let response = request.send().await.map_err(AccessError::from_transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(public_key = %public_key, status = status.as_u16(), "Listing request rejected");
            return Err(AccessError::from_status(status.as_u16(), &body));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                AccessError::MalformedResponse(e.to_string())
            } else {
                AccessError::from_transport(e)
            }
        })?;

        let entries = entries_from_listing(&body);
        info!(public_key = %public_key, count = entries.len(), "Resolved public resource");
        Ok(entries)
    }

    /// Start a streaming download
    ///
    /// Only the status line and headers have been received when this returns;
    /// the body is pulled by the caller.
    pub(crate) async fn open_download(&self, url: Url) -> Result<Response, AccessError> {
        debug!(url = %url, "Requesting file download");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(AccessError::from_transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Download request rejected");
            return Err(AccessError::from_status(status.as_u16(), &body));
        }

        Ok(response)
    }
}
