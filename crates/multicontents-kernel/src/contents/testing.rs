//! Test double that records every call it receives.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::ContentsResult;
use super::ops::ContentsManager;
use super::types::{ContentsModel, GetOptions};

/// Records `"<op> <args>"` strings and answers with empty successes.
#[derive(Debug, Default)]
pub struct RecordingManager {
    calls: Mutex<Vec<String>>,
}

impl RecordingManager {
    /// Calls seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ContentsManager for RecordingManager {
    async fn get(&self, path: &str, _opts: GetOptions) -> ContentsResult<ContentsModel> {
        self.record(format!("get {}", path));
        Ok(ContentsModel::file(path))
    }

    async fn file_exists(&self, path: &str) -> ContentsResult<bool> {
        self.record(format!("file_exists {}", path));
        Ok(false)
    }

    async fn dir_exists(&self, path: &str) -> ContentsResult<bool> {
        self.record(format!("dir_exists {}", path));
        Ok(false)
    }

    async fn is_hidden(&self, path: &str) -> ContentsResult<bool> {
        self.record(format!("is_hidden {}", path));
        Ok(false)
    }

    async fn save(&self, model: ContentsModel, path: &str) -> ContentsResult<ContentsModel> {
        self.record(format!("save {}", path));
        Ok(ContentsModel {
            path: path.to_string(),
            content: None,
            ..model
        })
    }

    async fn delete_file(&self, path: &str) -> ContentsResult<()> {
        self.record(format!("delete_file {}", path));
        Ok(())
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        self.record(format!("rename_file {} {}", old_path, new_path));
        Ok(())
    }
}
