//! Logical path normalization and storage-key prefixing.

use crate::error::FilesystemError;

/// Normalize a logical path.
///
/// Leading, trailing and repeated slashes are dropped, `.` segments are
/// removed and `..` segments are resolved against earlier segments. A `..`
/// that would climb above the root is rejected.
pub fn normalize_path(path: &str) -> Result<String, FilesystemError> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(FilesystemError::PathTraversalDetected {
                        path: path.to_string(),
                    });
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

/// Maps logical paths to storage keys under a fixed root prefix and back.
///
/// Scheme: `{prefix}/{normalized path}`, or just the normalized path when
/// no prefix is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPrefixer {
    /// Empty, or the normalized prefix followed by exactly one `/`.
    prefix: String,
}

impl PathPrefixer {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix)
        };
        Self { prefix }
    }

    /// Storage key for a logical file path.
    pub fn prefix_path(&self, path: &str) -> Result<String, FilesystemError> {
        Ok(format!("{}{}", self.prefix, normalize_path(path)?))
    }

    /// Storage key for a logical directory path, always ending in `/`.
    ///
    /// The root directory maps to the bare prefix.
    pub fn prefix_directory_path(&self, path: &str) -> Result<String, FilesystemError> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            Ok(self.prefix.clone())
        } else {
            Ok(format!("{}{}/", self.prefix, normalized))
        }
    }

    /// Logical path for a storage key. Keys outside the prefix are returned
    /// unchanged.
    pub fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}
