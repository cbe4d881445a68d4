//! Cache key validation
//!
//! A cache key is a single plain filename. Anything that could resolve outside
//! the cache root is rejected before a path is ever built from it.

use std::path::{Component, Path, PathBuf};

use crate::disk::AccessError;

/// Suffix used for in-progress downloads inside the cache root
pub(crate) const PARTIAL_SUFFIX: &str = ".part";

/// Validated filename addressing one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate a caller-supplied filename
    pub fn new(filename: &str) -> Result<Self, AccessError> {
        let invalid = || AccessError::InvalidFilename(filename.to_string());

        if filename.is_empty()
            || filename.contains(['/', '\\', '\0'])
            || filename == "."
            || filename == ".."
            || is_partial_name(filename)
        {
            return Err(invalid());
        }

        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == filename => {}
            _ => return Err(invalid()),
        }

        Ok(Self(filename.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The entry's path under `root`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

/// Whether `name` has the shape of an in-progress download
pub(crate) fn is_partial_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX)
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["report.pdf", "a.txt", ".bashrc", "no extension", "отчёт 2024.docx", "..hidden"] {
            let key = CacheKey::new(name).unwrap();
            assert_eq!(key.as_str(), name);
        }
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        for name in [
            "",
            ".",
            "..",
            "../secret",
            "../../etc/passwd",
            "a/b.txt",
            "/etc/passwd",
            "dir/",
            "..\\windows",
            "a\\b",
            "nul\0byte",
            ".x7Yq2.part",
        ] {
            assert!(
                matches!(CacheKey::new(name), Err(AccessError::InvalidFilename(_))),
                "accepted {:?}",
                name
            );
        }
    }

    #[test]
    fn test_path_stays_in_root() {
        let root = Path::new("/var/cache/public-disk");
        let key = CacheKey::new("report.pdf").unwrap();
        let path = key.path_in(root);
        assert_eq!(path, root.join("report.pdf"));
        assert_eq!(path.parent(), Some(root));
    }
}
