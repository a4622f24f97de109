//! Mount wrapper: one backend presented under a fixed path prefix.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::ContentsResult;
use super::ops::ContentsManager;
use super::registry::{BackendRegistry, BackendSpec};
use super::translate::PathTranslator;
use super::types::{CheckpointModel, ContentsModel, GetOptions, name_of};
use crate::checkpoints::Checkpoints;

/// A backend mounted at a proxy path.
///
/// Every operation takes virtual paths, translates them into the backend's
/// own namespace, and translates returned model paths back.
#[derive(Clone)]
pub struct MountWrapper {
    translator: PathTranslator,
    manager: Arc<dyn ContentsManager>,
}

impl fmt::Debug for MountWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountWrapper")
            .field("proxy_path", &self.translator.proxy_path())
            .finish_non_exhaustive()
    }
}

impl MountWrapper {
    /// Mount an already-built backend.
    pub fn new(proxy_path: impl AsRef<str>, manager: Arc<dyn ContentsManager>) -> Self {
        Self {
            translator: PathTranslator::new(proxy_path),
            manager,
        }
    }

    /// Mount a backend described by `spec`, building it through `registry`
    /// when it is given by name. The backend is constructed exactly once.
    pub fn from_spec(
        proxy_path: impl AsRef<str>,
        spec: BackendSpec,
        registry: &BackendRegistry,
    ) -> ContentsResult<Self> {
        let manager = match spec {
            BackendSpec::Instance(manager) => manager,
            BackendSpec::Named {
                manager_class,
                kwargs,
            } => registry.build(&manager_class, &kwargs)?,
        };
        Ok(Self::new(proxy_path, manager))
    }

    /// The wrapped backend.
    pub fn manager(&self) -> &Arc<dyn ContentsManager> {
        &self.manager
    }

    /// Path arithmetic for this mount.
    pub fn translator(&self) -> &PathTranslator {
        &self.translator
    }

    /// The normalized proxy path (`""` for root).
    pub fn proxy_path(&self) -> &str {
        self.translator.proxy_path()
    }

    /// See [`PathTranslator::is_parent_directory_of`].
    pub fn is_parent_directory_of(&self, path: &str) -> bool {
        self.translator.is_parent_directory_of(path)
    }

    /// See [`PathTranslator::is_sub_directory_of`].
    pub fn is_sub_directory_of(&self, path: &str) -> bool {
        self.translator.is_sub_directory_of(path)
    }

    /// See [`PathTranslator::to_actual_path`].
    pub fn to_actual_path(&self, path: &str) -> String {
        self.translator.to_actual_path(path)
    }

    /// See [`PathTranslator::to_proxy_path`].
    pub fn to_proxy_path(&self, actual_path: &str) -> String {
        self.translator.to_proxy_path(actual_path)
    }

    /// Rewrite a backend model (and its listing) into the virtual namespace.
    fn to_proxy_model(&self, model: &mut ContentsModel) {
        model.path = self.to_proxy_path(&model.path);
        if model.name.is_empty() {
            model.name = name_of(&model.path).to_string();
        }
        if model.is_dir() {
            if let Some(children) = model.entries_mut() {
                for child in children.iter_mut() {
                    child.path = self.to_proxy_path(&child.path);
                }
            }
        }
    }
}

#[async_trait]
impl ContentsManager for MountWrapper {
    async fn get(&self, path: &str, opts: GetOptions) -> ContentsResult<ContentsModel> {
        let actual = self.to_actual_path(path);
        let mut model = self.manager.get(&actual, opts).await?;
        self.to_proxy_model(&mut model);
        Ok(model)
    }

    async fn file_exists(&self, path: &str) -> ContentsResult<bool> {
        self.manager.file_exists(&self.to_actual_path(path)).await
    }

    async fn dir_exists(&self, path: &str) -> ContentsResult<bool> {
        self.manager.dir_exists(&self.to_actual_path(path)).await
    }

    async fn is_hidden(&self, path: &str) -> ContentsResult<bool> {
        self.manager.is_hidden(&self.to_actual_path(path)).await
    }

    async fn save(&self, model: ContentsModel, path: &str) -> ContentsResult<ContentsModel> {
        let mut saved = self.manager.save(model, &self.to_actual_path(path)).await?;
        self.to_proxy_model(&mut saved);
        Ok(saved)
    }

    async fn delete_file(&self, path: &str) -> ContentsResult<()> {
        self.manager.delete_file(&self.to_actual_path(path)).await
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        self.manager
            .rename_file(&self.to_actual_path(old_path), &self.to_actual_path(new_path))
            .await
    }

    fn checkpoints(&self) -> Arc<dyn Checkpoints> {
        self.manager.checkpoints()
    }

    async fn create_checkpoint(&self, path: &str) -> ContentsResult<CheckpointModel> {
        self.manager
            .create_checkpoint(&self.to_actual_path(path))
            .await
    }

    async fn list_checkpoints(&self, path: &str) -> ContentsResult<Vec<CheckpointModel>> {
        self.manager
            .list_checkpoints(&self.to_actual_path(path))
            .await
    }

    async fn restore_checkpoint(&self, checkpoint_id: &str, path: &str) -> ContentsResult<()> {
        self.manager
            .restore_checkpoint(checkpoint_id, &self.to_actual_path(path))
            .await
    }

    async fn delete_checkpoint(&self, checkpoint_id: &str, path: &str) -> ContentsResult<()> {
        self.manager
            .delete_checkpoint(checkpoint_id, &self.to_actual_path(path))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::backends::MemoryContentsManager;
    use crate::contents::testing::RecordingManager;
    use serde_json::Map;

    #[tokio::test]
    async fn test_from_named_spec() {
        let registry = BackendRegistry::with_builtins();
        let wrapper = MountWrapper::from_spec(
            "/scratch/",
            BackendSpec::Named {
                manager_class: "memory".to_string(),
                kwargs: Map::new(),
            },
            &registry,
        )
        .unwrap();
        assert_eq!(wrapper.proxy_path(), "scratch");
        assert!(wrapper.dir_exists("scratch").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_unknown_spec_fails() {
        let registry = BackendRegistry::with_builtins();
        let result = MountWrapper::from_spec(
            "x",
            BackendSpec::Named {
                manager_class: "nope.Manager".to_string(),
                kwargs: Map::new(),
            },
            &registry,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_rewrites_listing_paths() {
        let backend = MemoryContentsManager::new();
        backend
            .save(ContentsModel::file("foo/bar").with_text("x"), "foo/bar")
            .await
            .unwrap();
        let wrapper = MountWrapper::new("proxy", Arc::new(backend));

        let listing = wrapper
            .get("proxy/foo", GetOptions::with_content())
            .await
            .unwrap();
        assert_eq!(listing.path, "proxy/foo");
        let paths: Vec<_> = listing.entries().unwrap().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["proxy/foo/bar"]);
    }

    #[tokio::test]
    async fn test_mount_root_is_named_after_mount() {
        let wrapper = MountWrapper::new("mnt/project", Arc::new(MemoryContentsManager::new()));
        let model = wrapper.get("/mnt/project/", GetOptions::metadata()).await.unwrap();
        assert_eq!(model.path, "mnt/project");
        assert_eq!(model.name, "project");
    }

    #[tokio::test]
    async fn test_operations_translate_paths() {
        let recorder = Arc::new(RecordingManager::default());
        let wrapper = MountWrapper::new("proxy_path", recorder.clone());

        wrapper.save(ContentsModel::file("x"), "proxy_path/a").await.unwrap();
        wrapper.delete_file("proxy_path/b").await.unwrap();
        wrapper.file_exists("/proxy_path/c").await.unwrap();
        wrapper.dir_exists("proxy_path").await.unwrap();
        wrapper.is_hidden("proxy_path/.d").await.unwrap();
        wrapper
            .rename_file("proxy_path/old_path", "proxy_path/new_path")
            .await
            .unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                "save a",
                "delete_file b",
                "file_exists c",
                "dir_exists ",
                "is_hidden .d",
                "rename_file old_path new_path",
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_errors_pass_through() {
        let wrapper = MountWrapper::new("m", Arc::new(MemoryContentsManager::new()));
        let err = wrapper.get("m/missing", GetOptions::metadata()).await.unwrap_err();
        assert!(matches!(err, crate::contents::ContentsError::NotFound(_)));
    }
}
