//! End-to-end tests for the public access layer.
//!
//! Uses wiremock for both the listing API and the file host: resolve a public key,
//! pick an entry, fetch it through the download cache.

use public_disk_access::{
    AccessConfig, AccessError, CacheOutcome, DownloadCache, PublicDiskClient, PublicKey,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/v1/disk/public/resources";

fn test_config(server: &MockServer, cache_root: &std::path::Path) -> AccessConfig {
    AccessConfig::default()
        .with_listing_url(format!("{}{}", server.uri(), LISTING_PATH))
        .with_cache_root(cache_root)
}

#[tokio::test]
async fn test_resolve_then_fetch_populates_cache() {
    let server = MockServer::start().await;
    let download_url = format!("{}/x/a.txt", server.uri());

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("public_key", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_embedded": {"items": [{"name": "a.txt", "file": download_url.clone()}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/x/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello from a.txt"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let config = test_config(&server, temp.path());
    let client = PublicDiskClient::new(&config).unwrap();
    let cache = DownloadCache::from_config(&config, client.clone());

    let entries = client
        .resolve(&PublicKey::new("abc123").unwrap())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a.txt");
    assert_eq!(entries[0].download_url, download_url);

    let cached = cache
        .fetch(&entries[0].download_url, &entries[0].name)
        .await
        .unwrap();
    assert_eq!(cached.outcome(), CacheOutcome::Miss);
    assert_eq!(cached.read_to_end().await.unwrap(), b"hello from a.txt");
    assert_eq!(
        std::fs::read(temp.path().join("a.txt")).unwrap(),
        b"hello from a.txt"
    );

    // Repeat download is served locally; the file host mock expects exactly one call
    let again = cache
        .fetch(&entries[0].download_url, &entries[0].name)
        .await
        .unwrap();
    assert_eq!(again.outcome(), CacheOutcome::Hit);
    assert_eq!(again.read_to_end().await.unwrap(), b"hello from a.txt");
}

#[tokio::test]
async fn test_listing_without_embedded_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "shared folder",
            "type": "dir"
        })))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let client = PublicDiskClient::new(&test_config(&server, temp.path())).unwrap();

    let entries = client
        .resolve(&PublicKey::new("abc123").unwrap())
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_crafted_entry_name_cannot_escape_cache_root() {
    let server = MockServer::start().await;
    let download_url = format!("{}/x/evil", server.uri());

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_embedded": {"items": [{"name": "../../evil.sh", "file": download_url}]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/x/evil"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#!/bin/sh"))
        .expect(0)
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("cache");
    let config = test_config(&server, &root);
    let client = PublicDiskClient::new(&config).unwrap();
    let cache = DownloadCache::from_config(&config, client.clone());

    let entries = client
        .resolve(&PublicKey::new("abc123").unwrap())
        .await
        .unwrap();
    let result = cache
        .fetch(&entries[0].download_url, &entries[0].name)
        .await;

    assert!(matches!(result, Err(AccessError::InvalidFilename(_))));
    assert!(!root.exists());
}
