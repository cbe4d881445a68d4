//! Public disk API types
//!
//! Defines the public key token, listing entries, and the lenient mapping from the
//! listing response body to [`FileEntry`] values.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::errors::AccessError;

/// Opaque token identifying a public remote resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(String);

impl PublicKey {
    /// Wrap a raw public key, rejecting empty input
    ///
    /// The token is otherwise passed to the remote API verbatim.
    pub fn new(raw: impl Into<String>) -> Result<Self, AccessError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AccessError::InvalidInput(
                "public key must not be empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deserialize an optional size that might be encoded as a number, a string, or null.
fn deserialize_flexible_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleSizeVisitor;

    impl<'de> de::Visitor<'de> for FlexibleSizeVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<u64>, E> {
            Ok(Some(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<u64>, E> {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| de::Error::custom("negative size"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<u64>, E> {
            value.parse::<u64>().map(Some).map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<u64>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<u64>, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(FlexibleSizeVisitor)
}

/// One item of a public resource listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileEntry {
    /// Entry name as reported by the remote
    #[serde(default)]
    pub name: String,
    /// Per-file download URL (empty for directories)
    #[serde(rename = "file", default)]
    pub download_url: String,
    /// Size in bytes, when reported
    #[serde(
        rename = "size",
        default,
        deserialize_with = "deserialize_flexible_size"
    )]
    pub size_bytes: Option<u64>,
    /// MIME type, when reported
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Remote resource type ("file" or "dir")
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    /// Path of the entry inside the public resource
    #[serde(default)]
    pub path: Option<String>,
}

impl FileEntry {
    /// Check if this entry represents a directory
    pub fn is_dir(&self) -> bool {
        self.resource_type.as_deref() == Some("dir")
    }

    /// Whether the entry carries a download URL
    pub fn is_downloadable(&self) -> bool {
        !self.download_url.is_empty()
    }
}

/// Extract listing entries from a `{"_embedded": {"items": [...]}}` body
///
/// Missing or mistyped nesting yields an empty listing. Every array element maps
/// to exactly one entry, in order.
pub fn entries_from_listing(body: &Value) -> Vec<FileEntry> {
    let Some(items) = body.pointer("/_embedded/items").and_then(Value::as_array) else {
        debug!("Listing response has no _embedded.items, treating as empty");
        return Vec::new();
    };

    items.iter().map(entry_from_item).collect()
}

fn entry_from_item(item: &Value) -> FileEntry {
    match FileEntry::deserialize(item) {
        Ok(entry) => entry,
        Err(e) => {
            debug!(error = %e, "Listing item did not match expected shape, keeping name and file only");
            let field = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            FileEntry {
                name: field("name"),
                download_url: field("file"),
                ..FileEntry::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_public_key_rejects_empty() {
        assert!(matches!(
            PublicKey::new(""),
            Err(AccessError::InvalidInput(_))
        ));
        assert!(matches!(
            PublicKey::new("  \t"),
            Err(AccessError::InvalidInput(_))
        ));

        let key = PublicKey::new("https://disk.example/d/abc123").unwrap();
        assert_eq!(key.as_str(), "https://disk.example/d/abc123");
    }

    #[test]
    fn test_entries_preserve_order_and_fields() {
        let body = json!({
            "public_key": "abc123",
            "_embedded": {
                "items": [
                    {
                        "name": "b.txt",
                        "file": "https://x/b.txt",
                        "size": 12,
                        "mime_type": "text/plain",
                        "type": "file",
                        "path": "/b.txt"
                    },
                    {"name": "a.txt", "file": "https://x/a.txt"},
                    {"name": "c.pdf", "file": "https://x/c.pdf?disposition=attachment&hash=q%2Fw"}
                ],
                "total": 3
            }
        });

        let entries = entries_from_listing(&body);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "c.pdf"]);
        assert_eq!(entries[0].size_bytes, Some(12));
        assert_eq!(entries[0].mime_type.as_deref(), Some("text/plain"));
        assert_eq!(entries[0].path.as_deref(), Some("/b.txt"));
        assert_eq!(entries[1].size_bytes, None);
        assert_eq!(
            entries[2].download_url,
            "https://x/c.pdf?disposition=attachment&hash=q%2Fw"
        );
    }

    #[test]
    fn test_missing_nesting_is_empty() {
        for body in [
            json!({}),
            json!({"_embedded": {}}),
            json!({"_embedded": null}),
            json!({"_embedded": "nope"}),
            json!({"_embedded": {"items": {"name": "x"}}}),
            json!([1, 2, 3]),
            json!(null),
        ] {
            assert!(entries_from_listing(&body).is_empty(), "body: {}", body);
        }
    }

    #[test]
    fn test_directory_entries_are_kept() {
        let body = json!({"_embedded": {"items": [
            {"name": "photos", "type": "dir", "path": "/photos"},
            {"name": "a.txt", "type": "file", "file": "https://x/a.txt"}
        ]}});

        let entries = entries_from_listing(&body);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_dir());
        assert!(!entries[0].is_downloadable());
        assert!(!entries[1].is_dir());
        assert!(entries[1].is_downloadable());
    }

    #[test]
    fn test_string_sizes_and_bad_items() {
        let body = json!({"_embedded": {"items": [
            {"name": "big.iso", "file": "https://x/big.iso", "size": "4294967296"},
            {"name": "weird", "file": "https://x/weird", "size": -1},
            42
        ]}});

        let entries = entries_from_listing(&body);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].size_bytes, Some(4_294_967_296));
        // A negative size fails the item, but name and file survive
        assert_eq!(entries[1].name, "weird");
        assert_eq!(entries[1].download_url, "https://x/weird");
        assert_eq!(entries[1].size_bytes, None);
        assert_eq!(entries[2], FileEntry::default());
    }
}
