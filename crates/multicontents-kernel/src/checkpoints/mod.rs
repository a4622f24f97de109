//! Checkpoints: timestamped snapshots of individual files.
//!
//! - [`Checkpoints`] - Trait every snapshot store implements
//! - [`MultiVersionsFileCheckpoints`] - Keeps every snapshot on disk, one
//!   flat directory per checkpointed path
//! - [`NoOpCheckpoints`] - Stores nothing; for layers where a backend owns
//!   versioning (the router uses it)

mod file;
mod noop;

use async_trait::async_trait;

use crate::contents::{CheckpointModel, ContentFormat, ContentType, ContentsModel, ContentsResult};

pub use file::{MultiVersionsFileCheckpoints, checkpoint_dir_name, new_checkpoint_id};
pub use noop::NoOpCheckpoints;

/// Snapshot store operations.
///
/// Paths are in the namespace of the contents manager that owns the store.
#[async_trait]
pub trait Checkpoints: Send + Sync {
    /// Snapshot a plain file body (text, or base64 when `format` says so).
    async fn create_file_checkpoint(
        &self,
        content: &str,
        format: ContentFormat,
        path: &str,
    ) -> ContentsResult<CheckpointModel>;

    /// Snapshot a notebook document.
    async fn create_notebook_checkpoint(
        &self,
        nb: &serde_json::Value,
        path: &str,
    ) -> ContentsResult<CheckpointModel>;

    /// Load a snapshot back as a model of the given kind, content included.
    async fn get_checkpoint(
        &self,
        checkpoint_id: &str,
        path: &str,
        kind: ContentType,
    ) -> ContentsResult<ContentsModel>;

    /// All snapshots of `path`, newest first.
    async fn list_checkpoints(&self, path: &str) -> ContentsResult<Vec<CheckpointModel>>;

    /// Remove one snapshot.
    async fn delete_checkpoint(&self, checkpoint_id: &str, path: &str) -> ContentsResult<()>;

    /// Move one snapshot from `old_path` to `new_path`.
    async fn rename_checkpoint(
        &self,
        checkpoint_id: &str,
        old_path: &str,
        new_path: &str,
    ) -> ContentsResult<()>;

    /// Move every snapshot of `old_path` to `new_path`.
    async fn rename_all_checkpoints(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        for checkpoint in self.list_checkpoints(old_path).await? {
            self.rename_checkpoint(&checkpoint.id, old_path, new_path)
                .await?;
        }
        Ok(())
    }

    /// Remove every snapshot of `path`.
    async fn delete_all_checkpoints(&self, path: &str) -> ContentsResult<()> {
        for checkpoint in self.list_checkpoints(path).await? {
            self.delete_checkpoint(&checkpoint.id, path).await?;
        }
        Ok(())
    }
}
