//! Virtual ↔ actual path translation for one mount point.
//!
//! A mount's proxy path is stored without leading or trailing slashes;
//! `""` is the root mount and matches everything.

use super::types::{join, normalize};

/// Pure path arithmetic for a single proxy path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTranslator {
    proxy_path: String,
}

impl PathTranslator {
    /// Create a translator for `proxy_path` (slashes are stripped).
    pub fn new(proxy_path: impl AsRef<str>) -> Self {
        Self {
            proxy_path: normalize(proxy_path.as_ref()).to_string(),
        }
    }

    /// The normalized proxy path.
    pub fn proxy_path(&self) -> &str {
        &self.proxy_path
    }

    /// Returns true for the root mount.
    pub fn is_root(&self) -> bool {
        self.proxy_path.is_empty()
    }

    /// Number of path segments in the proxy path (0 for root).
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.proxy_path.split('/').count()
        }
    }

    /// Final segment of the proxy path.
    pub fn last_segment(&self) -> &str {
        self.proxy_path.rsplit('/').next().unwrap_or("")
    }

    /// True iff the proxy path is a segment-wise prefix of `path`.
    pub fn is_parent_directory_of(&self, path: &str) -> bool {
        if self.is_root() {
            return true;
        }
        let path = normalize(path);
        let mut segments = path.split('/');
        self.proxy_path
            .split('/')
            .all(|proxy_segment| segments.next() == Some(proxy_segment))
    }

    /// True iff this mount is a direct child of directory `path`.
    pub fn is_sub_directory_of(&self, path: &str) -> bool {
        let path = normalize(path);
        let proxy_parent = self
            .proxy_path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .unwrap_or("");
        proxy_parent == path && path != self.proxy_path
    }

    /// Strip the proxy prefix from a virtual path.
    ///
    /// Paths that are not under the mount come back normalized but otherwise
    /// untouched.
    pub fn to_actual_path(&self, path: &str) -> String {
        let path = normalize(path);
        if self.is_root() {
            return path.to_string();
        }
        if path == self.proxy_path {
            return String::new();
        }
        match path
            .strip_prefix(self.proxy_path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(rest) => normalize(rest).to_string(),
            None => path.to_string(),
        }
    }

    /// Prefix a backend path with the proxy path.
    pub fn to_proxy_path(&self, actual_path: &str) -> String {
        join(&self.proxy_path, actual_path)
    }
}
