//! On-disk checkpoint store keeping every version.
//!
//! Layout under `root_dir`:
//!
//! ```text
//! <root_dir>/<checkpoint_dir>/
//! ├── inside__folder__file___txt/
//! │   ├── 1700000000123456
//! │   └── 1700000042000017
//! └── notebook___ipynb/
//!     └── 1700000100654321
//! ```
//!
//! Each checkpointed path gets one flat directory; `/` becomes `__` and
//! `.` becomes `___`, so the directory never nests and never shadows a real
//! file name. Each snapshot is named by its creation timestamp.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

use super::Checkpoints;
use crate::contents::{
    CheckpointModel, ContentFormat, ContentType, ContentsError, ContentsModel, ContentsResult,
};

/// Directory name holding the snapshots of `path`.
pub fn checkpoint_dir_name(path: &str) -> String {
    path.trim_matches('/').replace('/', "__").replace('.', "___")
}

/// Fresh checkpoint id: seconds and microseconds since the epoch, no separator.
///
/// Two snapshots of the same path within one microsecond share an id and
/// the later one wins.
pub fn new_checkpoint_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}{:06}", now.as_secs(), now.subsec_micros())
}

/// Keeps every snapshot as its own file.
#[derive(Debug, Clone)]
pub struct MultiVersionsFileCheckpoints {
    root_dir: PathBuf,
    checkpoint_dir: String,
}

impl MultiVersionsFileCheckpoints {
    /// Default checkpoint directory name, relative to the root.
    pub const DEFAULT_CHECKPOINT_DIR: &'static str = ".ipynb_checkpoints";

    /// Create a store under `root_dir/checkpoint_dir`.
    pub fn new(root_dir: impl Into<PathBuf>, checkpoint_dir: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    /// Directory holding every snapshot directory.
    pub fn store_dir(&self) -> PathBuf {
        self.root_dir.join(&self.checkpoint_dir)
    }

    /// Directory holding the snapshots of `path`.
    pub fn checkpoints_path_for_file(&self, path: &str) -> PathBuf {
        self.store_dir().join(checkpoint_dir_name(path))
    }

    /// Full path of one snapshot.
    pub fn checkpoint_path(&self, checkpoint_id: &str, path: &str) -> ContentsResult<PathBuf> {
        if checkpoint_id.is_empty() || checkpoint_id.contains(['/', '\\']) || checkpoint_id == ".." {
            return Err(ContentsError::invalid_path(format!(
                "checkpoint id: {}",
                checkpoint_id
            )));
        }
        Ok(self.checkpoints_path_for_file(path).join(checkpoint_id))
    }

    async fn write_checkpoint(&self, path: &str, data: &[u8]) -> ContentsResult<CheckpointModel> {
        let dir = self.checkpoints_path_for_file(path);
        fs::create_dir_all(&dir).await?;

        let id = new_checkpoint_id();
        let file_path = dir.join(&id);
        tracing::debug!("creating checkpoint {} for {}", id, path);
        fs::write(&file_path, data).await?;

        Self::checkpoint_model(id, &file_path).await
    }

    async fn checkpoint_model(id: String, file_path: &Path) -> ContentsResult<CheckpointModel> {
        let meta = fs::metadata(file_path).await?;
        Ok(CheckpointModel {
            id,
            last_modified: meta.modified().unwrap_or(UNIX_EPOCH),
        })
    }
}

#[async_trait]
impl Checkpoints for MultiVersionsFileCheckpoints {
    async fn create_file_checkpoint(
        &self,
        content: &str,
        format: ContentFormat,
        path: &str,
    ) -> ContentsResult<CheckpointModel> {
        let data = match format {
            ContentFormat::Base64 => STANDARD
                .decode(content)
                .map_err(|e| ContentsError::bad_request(format!("invalid base64 body: {}", e)))?,
            ContentFormat::Text | ContentFormat::Json => content.as_bytes().to_vec(),
        };
        self.write_checkpoint(path, &data).await
    }

    async fn create_notebook_checkpoint(
        &self,
        nb: &serde_json::Value,
        path: &str,
    ) -> ContentsResult<CheckpointModel> {
        let data = serde_json::to_vec_pretty(nb)?;
        self.write_checkpoint(path, &data).await
    }

    async fn get_checkpoint(
        &self,
        checkpoint_id: &str,
        path: &str,
        kind: ContentType,
    ) -> ContentsResult<ContentsModel> {
        let file_path = self.checkpoint_path(checkpoint_id, path)?;
        let data = match fs::read(&file_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContentsError::not_found(format!(
                    "checkpoint {} for {}",
                    checkpoint_id, path
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let model = match kind {
            ContentType::Notebook => {
                ContentsModel::notebook(path).with_json(serde_json::from_slice(&data)?)
            }
            ContentType::File => match String::from_utf8(data) {
                Ok(text) => ContentsModel::file(path).with_text(text),
                Err(e) => ContentsModel::file(path).with_base64(STANDARD.encode(e.into_bytes())),
            },
            ContentType::Directory => {
                return Err(ContentsError::bad_request(format!(
                    "directories have no checkpoints: {}",
                    path
                )));
            }
        };
        Ok(model)
    }

    async fn list_checkpoints(&self, path: &str) -> ContentsResult<Vec<CheckpointModel>> {
        let dir = self.checkpoints_path_for_file(path);
        if !fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut checkpoints = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let id = entry.file_name().to_string_lossy().into_owned();
            checkpoints.push(Self::checkpoint_model(id, &entry.path()).await?);
        }

        // Newest first
        checkpoints.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(checkpoints)
    }

    async fn delete_checkpoint(&self, checkpoint_id: &str, path: &str) -> ContentsResult<()> {
        let file_path = self.checkpoint_path(checkpoint_id, path)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ContentsError::not_found(
                format!("checkpoint {} for {}", checkpoint_id, path),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename_checkpoint(
        &self,
        checkpoint_id: &str,
        old_path: &str,
        new_path: &str,
    ) -> ContentsResult<()> {
        let from = self.checkpoint_path(checkpoint_id, old_path)?;
        let to = self.checkpoint_path(checkpoint_id, new_path)?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from, &to).await?;
        Ok(())
    }
}
