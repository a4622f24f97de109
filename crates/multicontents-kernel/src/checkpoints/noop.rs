//! Checkpoint store that keeps nothing.

use async_trait::async_trait;
use std::time::SystemTime;

use super::{Checkpoints, new_checkpoint_id};
use crate::contents::{
    CheckpointModel, ContentFormat, ContentType, ContentsError, ContentsModel, ContentsResult,
};

/// Reports zero checkpoints and accepts deletions silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCheckpoints;

impl NoOpCheckpoints {
    fn unsaved() -> CheckpointModel {
        CheckpointModel {
            id: new_checkpoint_id(),
            last_modified: SystemTime::now(),
        }
    }
}

#[async_trait]
impl Checkpoints for NoOpCheckpoints {
    async fn create_file_checkpoint(
        &self,
        _content: &str,
        _format: ContentFormat,
        _path: &str,
    ) -> ContentsResult<CheckpointModel> {
        Ok(Self::unsaved())
    }

    async fn create_notebook_checkpoint(
        &self,
        _nb: &serde_json::Value,
        _path: &str,
    ) -> ContentsResult<CheckpointModel> {
        Ok(Self::unsaved())
    }

    async fn get_checkpoint(
        &self,
        checkpoint_id: &str,
        path: &str,
        _kind: ContentType,
    ) -> ContentsResult<ContentsModel> {
        Err(ContentsError::not_found(format!(
            "checkpoint {} for {}",
            checkpoint_id, path
        )))
    }

    async fn list_checkpoints(&self, _path: &str) -> ContentsResult<Vec<CheckpointModel>> {
        Ok(Vec::new())
    }

    async fn delete_checkpoint(&self, _checkpoint_id: &str, _path: &str) -> ContentsResult<()> {
        Ok(())
    }

    async fn rename_checkpoint(
        &self,
        _checkpoint_id: &str,
        _old_path: &str,
        _new_path: &str,
    ) -> ContentsResult<()> {
        Ok(())
    }
}
