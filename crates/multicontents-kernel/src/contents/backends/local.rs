//! Local filesystem backend.
//!
//! Serves a directory on disk, with path security to prevent escaping the
//! root directory. `.ipynb` files are served as notebooks.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::fs;

use super::Body;
use crate::checkpoints::{Checkpoints, MultiVersionsFileCheckpoints};
use crate::contents::ops::ContentsManager;
use crate::contents::types::{ContentType, ContentsModel, GetOptions, is_hidden_path, join, normalize};
use crate::contents::{ContentsError, ContentsResult};

/// Local filesystem contents manager.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/home/amy`, then `get("work/a.ipynb")` reads `/home/amy/work/a.ipynb`.
///
/// Path security is enforced: `..` segments and symlinks leading outside
/// the root are refused.
#[derive(Debug, Clone)]
pub struct FileContentsManager {
    root: PathBuf,
    read_only: bool,
    checkpoints: Arc<MultiVersionsFileCheckpoints>,
}

impl FileContentsManager {
    /// Create a manager rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        let checkpoints = Arc::new(MultiVersionsFileCheckpoints::new(
            root.clone(),
            MultiVersionsFileCheckpoints::DEFAULT_CHECKPOINT_DIR,
        ));
        Self {
            root,
            read_only: false,
            checkpoints,
        }
    }

    /// Create a read-only manager.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        let mut manager = Self::new(root);
        manager.read_only = true;
        manager
    }

    /// Store checkpoints under `root/<checkpoint_dir>` instead of the default.
    pub fn with_checkpoint_dir(mut self, checkpoint_dir: impl Into<String>) -> Self {
        self.checkpoints = Arc::new(MultiVersionsFileCheckpoints::new(
            self.root.clone(),
            checkpoint_dir,
        ));
        self
    }

    /// Resolve a relative path to an absolute path within the root.
    fn resolve(&self, path: &str) -> ContentsResult<PathBuf> {
        let path = normalize(path);
        if path.split('/').any(|segment| segment == "..") {
            return Err(ContentsError::path_escapes_root(path.to_string()));
        }
        if path.is_empty() {
            return Ok(self.root.clone());
        }

        let full = self.root.join(path);

        // Symlinks may still point outside; check the real location
        if full.exists() {
            let canonical = dunce::canonicalize(&full)?;
            if !canonical.starts_with(&self.root) {
                return Err(ContentsError::path_escapes_root(format!(
                    "{} is not under {}",
                    canonical.display(),
                    self.root.display()
                )));
            }
        }

        Ok(full)
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> ContentsResult<()> {
        if self.read_only {
            Err(ContentsError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Map a missing file to `NotFound` with the caller's path.
    fn io_error(path: &str, e: io::Error) -> ContentsError {
        if e.kind() == io::ErrorKind::NotFound {
            ContentsError::not_found(path.to_string())
        } else {
            ContentsError::Io(e)
        }
    }

    fn kind_of(path: &str, meta: &std::fs::Metadata) -> ContentType {
        if meta.is_dir() {
            ContentType::Directory
        } else if path.ends_with(".ipynb") {
            ContentType::Notebook
        } else {
            ContentType::File
        }
    }

    /// Convert std::fs::Metadata to a metadata-only model.
    fn metadata_to_model(&self, path: &str, meta: &std::fs::Metadata) -> ContentsModel {
        let mut model = ContentsModel::base(Self::kind_of(path, meta), path);
        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
        model.last_modified = modified;
        model.created = meta.created().unwrap_or(modified);
        model.writable = !self.read_only && !meta.permissions().readonly();
        model
    }

    async fn list_dir(
        &self,
        path: &str,
        full_path: &Path,
        hidden: bool,
    ) -> ContentsResult<Vec<ContentsModel>> {
        let store_dir = self.checkpoints.store_dir();
        let mut children = Vec::new();
        let mut dir = fs::read_dir(full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path() == store_dir || (!hidden && name.starts_with('.')) {
                continue;
            }
            // Dangling symlinks have no metadata; skip them
            let Ok(meta) = fs::metadata(entry.path()).await else {
                continue;
            };
            children.push(self.metadata_to_model(&join(path, &name), &meta));
        }

        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    /// Returns true if the directory holds anything besides the checkpoint store.
    async fn has_entries(&self, full_path: &Path) -> ContentsResult<bool> {
        let store_dir = self.checkpoints.store_dir();
        let mut dir = fs::read_dir(full_path).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.path() != store_dir {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl ContentsManager for FileContentsManager {
    async fn get(&self, path: &str, opts: GetOptions) -> ContentsResult<ContentsModel> {
        let path = normalize(path);
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| Self::io_error(path, e))?;

        let mut model = self.metadata_to_model(path, &meta);
        match (opts.kind, model.kind) {
            (Some(ContentType::Directory), kind) if !kind.is_dir() => {
                return Err(ContentsError::not_a_directory(path.to_string()));
            }
            (Some(ContentType::File | ContentType::Notebook), ContentType::Directory) => {
                return Err(ContentsError::is_a_directory(path.to_string()));
            }
            _ => {}
        }

        if opts.content {
            if model.is_dir() {
                let children = self.list_dir(path, &full_path, opts.hidden).await?;
                model = model.with_entries(children);
            } else {
                let data = fs::read(&full_path)
                    .await
                    .map_err(|e| Self::io_error(path, e))?;
                let body = if model.kind.is_notebook() {
                    Body::Notebook(serde_json::from_slice(&data)?)
                } else {
                    Body::Bytes(data)
                };
                body.fill(&mut model, opts.format)?;
            }
        }
        Ok(model)
    }

    async fn file_exists(&self, path: &str) -> ContentsResult<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::metadata(&full_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    async fn dir_exists(&self, path: &str) -> ContentsResult<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::metadata(&full_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn is_hidden(&self, path: &str) -> ContentsResult<bool> {
        Ok(is_hidden_path(path))
    }

    async fn save(&self, model: ContentsModel, path: &str) -> ContentsResult<ContentsModel> {
        self.check_writable()?;
        let path = normalize(path);
        let full_path = self.resolve(path)?;
        let existing = fs::metadata(&full_path).await.ok();

        if model.kind.is_dir() {
            match existing {
                Some(meta) if meta.is_dir() => {}
                Some(_) => {
                    return Err(ContentsError::bad_request(format!(
                        "{} exists and is not a directory",
                        path
                    )));
                }
                None => fs::create_dir_all(&full_path).await?,
            }
        } else {
            if path.is_empty() || existing.is_some_and(|meta| meta.is_dir()) {
                return Err(ContentsError::is_a_directory(path.to_string()));
            }
            let data = Body::from_model(model, path)?.into_bytes()?;

            // Ensure parent directory exists
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            tracing::trace!("writing {} bytes to {}", data.len(), full_path.display());
            fs::write(&full_path, data).await?;
        }

        self.get(path, GetOptions::metadata()).await
    }

    async fn delete_file(&self, path: &str) -> ContentsResult<()> {
        self.check_writable()?;
        let path = normalize(path);
        if path.is_empty() {
            return Err(ContentsError::permission_denied("cannot remove root"));
        }

        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| Self::io_error(path, e))?;

        if meta.is_dir() {
            if self.has_entries(&full_path).await? {
                return Err(ContentsError::directory_not_empty(path.to_string()));
            }
            fs::remove_dir_all(&full_path).await?;
        } else {
            fs::remove_file(&full_path).await?;
            self.checkpoints.delete_all_checkpoints(path).await?;
        }
        Ok(())
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        self.check_writable()?;
        let old_path = normalize(old_path);
        let new_path = normalize(new_path);
        if old_path == new_path {
            return Ok(());
        }
        if old_path.is_empty() || new_path.is_empty() {
            return Err(ContentsError::bad_request("cannot rename root"));
        }

        let from = self.resolve(old_path)?;
        let to = self.resolve(new_path)?;
        let meta = fs::metadata(&from)
            .await
            .map_err(|e| Self::io_error(old_path, e))?;
        if fs::metadata(&to).await.is_ok() {
            return Err(ContentsError::already_exists(new_path.to_string()));
        }

        // Ensure parent of destination exists
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from, &to).await?;

        if !meta.is_dir() {
            self.checkpoints
                .rename_all_checkpoints(old_path, new_path)
                .await?;
        }
        Ok(())
    }

    fn checkpoints(&self) -> Arc<dyn Checkpoints> {
        self.checkpoints.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::types::{Content, ContentFormat};
    use tempfile::TempDir;

    fn setup() -> (FileContentsManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let manager = FileContentsManager::new(dir.path());
        (manager, dir)
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let (manager, dir) = setup();
        manager
            .save(ContentsModel::file("x").with_text("hello world"), "sub/test.txt")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("sub/test.txt")).unwrap(),
            "hello world"
        );

        let model = manager
            .get("sub/test.txt", GetOptions::with_content())
            .await
            .unwrap();
        assert_eq!(model.name, "test.txt");
        assert_eq!(model.content, Some(Content::Text("hello world".into())));
        assert_eq!(model.format, Some(ContentFormat::Text));
    }

    #[tokio::test]
    async fn test_listing_skips_hidden() {
        let (manager, dir) = setup();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        std::fs::write(dir.path().join("root.txt"), "x").unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();

        let root = manager.get("/", GetOptions::with_content()).await.unwrap();
        assert!(root.is_dir());
        let paths: Vec<_> = root.entries().unwrap().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["root.txt", "subdir"]);
    }

    #[tokio::test]
    async fn test_notebook_round_trip() {
        let (manager, _dir) = setup();
        let nb = serde_json::json!({"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5});
        manager
            .save(ContentsModel::notebook("n").with_json(nb.clone()), "n.ipynb")
            .await
            .unwrap();

        let model = manager.get("n.ipynb", GetOptions::with_content()).await.unwrap();
        assert_eq!(model.kind, ContentType::Notebook);
        assert_eq!(model.content, Some(Content::Json(nb)));
    }

    #[tokio::test]
    async fn test_binary_served_as_base64() {
        let (manager, dir) = setup();
        std::fs::write(dir.path().join("blob.bin"), [0xffu8, 0x00]).unwrap();

        let model = manager.get("blob.bin", GetOptions::with_content()).await.unwrap();
        assert_eq!(model.format, Some(ContentFormat::Base64));
        assert_eq!(model.content, Some(Content::Text("/wA=".into())));
    }

    #[tokio::test]
    async fn test_read_only() {
        let dir = TempDir::new().unwrap();
        let manager = FileContentsManager::read_only(dir.path());

        let result = manager
            .save(ContentsModel::file("x").with_text("x"), "test.txt")
            .await;
        assert!(matches!(result, Err(ContentsError::ReadOnly)));
    }

    #[tokio::test]
    async fn test_path_escape_blocked() {
        let (manager, _dir) = setup();
        let result = manager.get("../../../etc/passwd", GetOptions::with_content()).await;
        assert!(matches!(result, Err(ContentsError::PathEscapesRoot(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let (manager, dir) = setup();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let result = manager.get("link", GetOptions::metadata()).await;
        assert!(matches!(result, Err(ContentsError::PathEscapesRoot(_))));
    }

    #[tokio::test]
    async fn test_rename_and_conflict() {
        let (manager, _dir) = setup();
        manager
            .save(ContentsModel::file("a").with_text("content"), "old.txt")
            .await
            .unwrap();
        manager
            .save(ContentsModel::file("b").with_text("other"), "taken.txt")
            .await
            .unwrap();

        let err = manager.rename_file("old.txt", "taken.txt").await.unwrap_err();
        assert!(matches!(err, ContentsError::AlreadyExists(_)));

        manager.rename_file("old.txt", "moved/new.txt").await.unwrap();
        assert!(!manager.file_exists("old.txt").await.unwrap());
        assert!(manager.file_exists("moved/new.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_directory_rules() {
        let (manager, dir) = setup();
        manager
            .save(ContentsModel::file("a").with_text("a"), "d/a.txt")
            .await
            .unwrap();

        let err = manager.delete_file("d").await.unwrap_err();
        assert!(matches!(err, ContentsError::DirectoryNotEmpty(_)));

        manager.delete_file("d/a.txt").await.unwrap();
        std::fs::create_dir(dir.path().join("d/.git")).unwrap();
        std::fs::write(dir.path().join("d/.git/HEAD"), "ref").unwrap();

        // Hidden entries still count
        let err = manager.delete_file("d").await.unwrap_err();
        assert!(matches!(err, ContentsError::DirectoryNotEmpty(_)));
        assert!(dir.path().join("d/.git/HEAD").exists());

        std::fs::remove_dir_all(dir.path().join("d/.git")).unwrap();
        manager.delete_file("d").await.unwrap();
        assert!(!manager.dir_exists("d").await.unwrap());
    }

    #[tokio::test]
    async fn test_hidden_listing_skips_checkpoint_store() {
        let (manager, dir) = setup();
        manager
            .save(ContentsModel::file("a").with_text("v1"), "a.txt")
            .await
            .unwrap();
        manager.create_checkpoint("a.txt").await.unwrap();
        std::fs::write(dir.path().join(".env"), "KEY=1").unwrap();

        let root = manager
            .get("", GetOptions::with_content().include_hidden())
            .await
            .unwrap();
        let paths: Vec<_> = root.entries().unwrap().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec![".env", "a.txt"]);
    }

    #[tokio::test]
    async fn test_checkpoints_follow_file() {
        let (manager, _dir) = setup();
        manager
            .save(ContentsModel::file("a").with_text("v1"), "a.txt")
            .await
            .unwrap();
        let checkpoint = manager.create_checkpoint("a.txt").await.unwrap();
        manager
            .save(ContentsModel::file("a").with_text("v2"), "a.txt")
            .await
            .unwrap();

        manager.restore_checkpoint(&checkpoint.id, "a.txt").await.unwrap();
        let model = manager.get("a.txt", GetOptions::with_content()).await.unwrap();
        assert_eq!(model.content, Some(Content::Text("v1".into())));

        manager.rename_file("a.txt", "b.txt").await.unwrap();
        assert!(manager.list_checkpoints("a.txt").await.unwrap().is_empty());
        assert_eq!(manager.list_checkpoints("b.txt").await.unwrap().len(), 1);

        manager.delete_file("b.txt").await.unwrap();
        assert!(manager.list_checkpoints("b.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_dir_is_hidden() {
        let (manager, _dir) = setup();
        manager
            .save(ContentsModel::file("a").with_text("v1"), "a.txt")
            .await
            .unwrap();
        manager.create_checkpoint("a.txt").await.unwrap();

        let root = manager.get("", GetOptions::with_content()).await.unwrap();
        assert_eq!(root.entries().unwrap().len(), 1);
        assert!(manager.is_hidden(".ipynb_checkpoints").await.unwrap());
    }
}
