//! Contents manager trait.
//!
//! This is the capability set every storage backend exposes, and the one
//! the router exposes in turn. Paths are slash-delimited strings relative
//! to the manager's own root; leading and trailing slashes are ignored.

use async_trait::async_trait;
use std::sync::Arc;

use super::types::{CheckpointModel, Content, ContentFormat, ContentType, ContentsModel, GetOptions};
use super::{ContentsError, ContentsResult};
use crate::checkpoints::{Checkpoints, NoOpCheckpoints};

/// Core contents operations.
///
/// The `MultiContentsManager` handles routing and path translation;
/// backends only ever see paths in their own namespace.
#[async_trait]
pub trait ContentsManager: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Fetch the model at `path`.
    ///
    /// With `opts.content` set, files carry their body and directories
    /// carry one child model per entry (children without content).
    async fn get(&self, path: &str, opts: GetOptions) -> ContentsResult<ContentsModel>;

    /// Returns true if a file or notebook exists at `path`.
    async fn file_exists(&self, path: &str) -> ContentsResult<bool>;

    /// Returns true if a directory exists at `path`.
    async fn dir_exists(&self, path: &str) -> ContentsResult<bool>;

    /// Returns true if `path` is hidden (any dot-prefixed segment).
    async fn is_hidden(&self, path: &str) -> ContentsResult<bool>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Store `model` at `path` and return the stored model (without content).
    ///
    /// Saving a directory model creates the directory.
    async fn save(&self, model: ContentsModel, path: &str) -> ContentsResult<ContentsModel>;

    /// Delete a file, notebook or empty directory.
    async fn delete_file(&self, path: &str) -> ContentsResult<()>;

    /// Rename a file or directory within this manager.
    async fn rename_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()>;

    // ========================================================================
    // Checkpoints (default implementations)
    // ========================================================================

    /// Checkpoint store backing this manager.
    fn checkpoints(&self) -> Arc<dyn Checkpoints> {
        Arc::new(NoOpCheckpoints)
    }

    /// Snapshot the current content of `path`.
    async fn create_checkpoint(&self, path: &str) -> ContentsResult<CheckpointModel> {
        let model = self.get(path, GetOptions::with_content()).await?;
        let checkpoints = self.checkpoints();
        match (model.kind, model.content) {
            (ContentType::Notebook, Some(Content::Json(nb))) => {
                checkpoints.create_notebook_checkpoint(&nb, path).await
            }
            (ContentType::File, Some(Content::Text(body))) => {
                let format = model.format.unwrap_or(ContentFormat::Text);
                checkpoints.create_file_checkpoint(&body, format, path).await
            }
            (ContentType::Directory, _) => Err(ContentsError::bad_request(format!(
                "cannot checkpoint a directory: {}",
                path
            ))),
            _ => Err(ContentsError::other(format!("no content to checkpoint: {}", path))),
        }
    }

    /// List snapshots of `path`, newest first.
    async fn list_checkpoints(&self, path: &str) -> ContentsResult<Vec<CheckpointModel>> {
        self.checkpoints().list_checkpoints(path).await
    }

    /// Overwrite `path` with the snapshot `checkpoint_id`.
    async fn restore_checkpoint(&self, checkpoint_id: &str, path: &str) -> ContentsResult<()> {
        let kind = self.get(path, GetOptions::metadata()).await?.kind;
        let model = self
            .checkpoints()
            .get_checkpoint(checkpoint_id, path, kind)
            .await?;
        self.save(model, path).await?;
        Ok(())
    }

    /// Drop the snapshot `checkpoint_id` of `path`.
    async fn delete_checkpoint(&self, checkpoint_id: &str, path: &str) -> ContentsResult<()> {
        self.checkpoints().delete_checkpoint(checkpoint_id, path).await
    }
}
