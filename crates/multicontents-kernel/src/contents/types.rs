//! Core contents types.
//!
//! These mirror the notebook server's contents model: every `get`/`save`
//! answers with a [`ContentsModel`], and directory models carry their
//! children as nested models.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Placeholder timestamp for models that have no backing storage.
pub const PLACEHOLDER_TIMESTAMP: Duration = Duration::from_secs(86_400);

/// Returns the placeholder instant used for synthetic models.
pub fn placeholder_time() -> SystemTime {
    UNIX_EPOCH + PLACEHOLDER_TIMESTAMP
}

/// Kind of entry a model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain file (text or binary).
    File,
    /// Directory.
    Directory,
    /// Jupyter notebook (`.ipynb`).
    Notebook,
}

impl ContentType {
    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, ContentType::Directory)
    }

    /// Returns true if this is a notebook.
    pub fn is_notebook(&self) -> bool {
        matches!(self, ContentType::Notebook)
    }
}

/// Encoding of a model's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// UTF-8 text.
    Text,
    /// Base64-encoded bytes.
    Base64,
    /// Structured JSON (notebooks, directory listings).
    Json,
}

/// Payload of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Directory children.
    Directory(Vec<ContentsModel>),
    /// Text or base64 payload, depending on the model's format.
    Text(String),
    /// Notebook document.
    Json(serde_json::Value),
}

impl Content {
    /// Directory children, if this is a listing.
    pub fn as_entries(&self) -> Option<&[ContentsModel]> {
        match self {
            Content::Directory(entries) => Some(entries),
            _ => None,
        }
    }

    /// Text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A file, notebook or directory as seen through a contents manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentsModel {
    /// Final path segment.
    pub name: String,
    /// Full path, in the namespace of whoever answered.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: ContentType,
    /// Whether the caller may write here.
    pub writable: bool,
    /// Last modification time.
    pub last_modified: SystemTime,
    /// Creation time.
    pub created: SystemTime,
    /// Payload; `None` when only metadata was requested.
    pub content: Option<Content>,
    /// Payload encoding.
    pub format: Option<ContentFormat>,
    /// MIME type for plain files.
    pub mimetype: Option<String>,
}

impl ContentsModel {
    /// Build a bare model with placeholder timestamps and no content.
    pub fn base(kind: ContentType, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: name_of(&path).to_string(),
            path,
            kind,
            writable: true,
            last_modified: placeholder_time(),
            created: placeholder_time(),
            content: None,
            format: None,
            mimetype: None,
        }
    }

    /// Bare directory model.
    pub fn directory(path: impl Into<String>) -> Self {
        Self::base(ContentType::Directory, path)
    }

    /// Bare file model.
    pub fn file(path: impl Into<String>) -> Self {
        Self::base(ContentType::File, path)
    }

    /// Bare notebook model.
    pub fn notebook(path: impl Into<String>) -> Self {
        Self::base(ContentType::Notebook, path)
    }

    /// Attach a text payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(Content::Text(text.into()));
        self.format = Some(ContentFormat::Text);
        self
    }

    /// Attach a base64 payload.
    pub fn with_base64(mut self, encoded: impl Into<String>) -> Self {
        self.content = Some(Content::Text(encoded.into()));
        self.format = Some(ContentFormat::Base64);
        self
    }

    /// Attach a notebook document.
    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.content = Some(Content::Json(value));
        self.format = Some(ContentFormat::Json);
        self
    }

    /// Attach directory children.
    pub fn with_entries(mut self, entries: Vec<ContentsModel>) -> Self {
        self.content = Some(Content::Directory(entries));
        self.format = Some(ContentFormat::Json);
        self
    }

    /// Returns true if this describes a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Directory children, if present.
    pub fn entries(&self) -> Option<&[ContentsModel]> {
        self.content.as_ref().and_then(Content::as_entries)
    }

    /// Mutable directory children, if present.
    pub fn entries_mut(&mut self) -> Option<&mut Vec<ContentsModel>> {
        match self.content.as_mut() {
            Some(Content::Directory(entries)) => Some(entries),
            _ => None,
        }
    }
}

/// Options for [`ContentsManager::get`](super::ContentsManager::get).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetOptions {
    /// Include the payload (file body or directory listing).
    pub content: bool,
    /// Require the entry to be of this kind.
    pub kind: Option<ContentType>,
    /// Requested payload encoding for plain files.
    pub format: Option<ContentFormat>,
    /// List dot-prefixed children too.
    pub hidden: bool,
}

impl GetOptions {
    /// Metadata only.
    pub fn metadata() -> Self {
        Self::default()
    }

    /// Metadata plus payload.
    pub fn with_content() -> Self {
        Self {
            content: true,
            ..Self::default()
        }
    }

    /// Require a specific kind.
    pub fn kind(mut self, kind: ContentType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Request a specific format.
    pub fn format(mut self, format: ContentFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Include hidden entries in directory listings.
    pub fn include_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// A stored snapshot of one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointModel {
    /// Checkpoint identifier (decimal timestamp digits).
    pub id: String,
    /// When the snapshot was written.
    pub last_modified: SystemTime,
}

/// Strip leading and trailing slashes.
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Final segment of a slash-delimited path.
pub fn name_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Returns true if any segment of `path` starts with a dot.
pub fn is_hidden_path(path: &str) -> bool {
    normalize(path).split('/').any(|segment| segment.starts_with('.'))
}

/// Join two slash-delimited paths, ignoring empty sides.
pub fn join(base: &str, rest: &str) -> String {
    let base = normalize(base);
    let rest = normalize(rest);
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_model() {
        let model = ContentsModel::directory("foo/bar/");
        assert_eq!(model.name, "bar");
        assert_eq!(model.path, "foo/bar/");
        assert!(model.is_dir());
        assert_eq!(model.created, placeholder_time());
        assert!(model.content.is_none());

        let root = ContentsModel::directory("/");
        assert_eq!(root.name, "");
    }

    #[test]
    fn test_payload_builders() {
        let text = ContentsModel::file("a.txt").with_text("hi");
        assert_eq!(text.format, Some(ContentFormat::Text));
        assert_eq!(text.content.as_ref().and_then(Content::as_text), Some("hi"));

        let dir = ContentsModel::directory("d").with_entries(vec![ContentsModel::file("d/x")]);
        assert_eq!(dir.entries().map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_model_serializes_type_field() {
        let model = ContentsModel::notebook("n.ipynb").with_json(serde_json::json!({"cells": []}));
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["type"], "notebook");
        assert_eq!(value["format"], "json");
        assert_eq!(value["content"]["cells"], serde_json::json!([]));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(normalize("/foo/bar/"), "foo/bar");
        assert_eq!(name_of("foo/bar"), "bar");
        assert_eq!(name_of("foo"), "foo");
        assert_eq!(join("", "x"), "x");
        assert_eq!(join("foo", ""), "foo");
        assert_eq!(join("/foo/", "/bar/baz"), "foo/bar/baz");
        assert!(is_hidden_path("a/.git/config"));
        assert!(!is_hidden_path("a/b.txt"));
    }

    #[test]
    fn test_get_options() {
        let opts = GetOptions::with_content().kind(ContentType::File);
        assert!(opts.content);
        assert_eq!(opts.kind, Some(ContentType::File));
        assert!(!GetOptions::metadata().content);
        assert!(!opts.hidden);
        assert!(opts.include_hidden().hidden);
    }
}
