//! Multi-mount router.
//!
//! Routes every operation to the most specific mount, merges mount points
//! into directory listings, and falls back to copy-then-delete when a
//! rename crosses a mount boundary.

use async_trait::async_trait;
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use super::ops::ContentsManager;
use super::registry::{BackendRegistry, BackendSpec};
use super::types::{ContentType, ContentsModel, GetOptions, join, normalize};
use super::wrapper::MountWrapper;
use super::{ContentsError, ContentsResult};
use crate::config::MultiContentsConfig;

/// Serves several backends under one virtual namespace.
///
/// Mounts are searched in a fixed order computed at construction: deepest
/// proxy path first, then longest final segment, with the root mount (`""`)
/// last so it catches everything else.
///
/// # Example
///
/// ```ignore
/// let router = MultiContentsManager::new(
///     vec![
///         ("".into(), BackendSpec::named("file", home_args)),
///         ("tmp".into(), BackendSpec::named("memory", Default::default())),
///     ],
///     &BackendRegistry::with_builtins(),
/// )?;
///
/// // "tmp/a.txt" goes to the memory backend as "a.txt"
/// router.save(ContentsModel::file("a.txt").with_text("hi"), "tmp/a.txt").await?;
/// ```
#[derive(Debug, Clone)]
pub struct MultiContentsManager {
    mounts: Vec<MountWrapper>,
}

impl MultiContentsManager {
    /// Build one mount per `(proxy_path, backend)` pair.
    pub fn new(
        specs: Vec<(String, BackendSpec)>,
        registry: &BackendRegistry,
    ) -> ContentsResult<Self> {
        let mounts = specs
            .into_iter()
            .map(|(proxy_path, spec)| MountWrapper::from_spec(proxy_path, spec, registry))
            .collect::<ContentsResult<Vec<_>>>()?;
        Self::from_mounts(mounts)
    }

    /// Build from a loaded configuration.
    pub fn from_config(
        config: &MultiContentsConfig,
        registry: &BackendRegistry,
    ) -> ContentsResult<Self> {
        Self::new(config.specs(), registry)
    }

    /// Build from already-wrapped mounts.
    ///
    /// Fails with `Config` if two mounts share a proxy path.
    pub fn from_mounts(mut mounts: Vec<MountWrapper>) -> ContentsResult<Self> {
        let mut seen = HashSet::new();
        for mount in &mounts {
            if !seen.insert(mount.proxy_path().to_string()) {
                return Err(ContentsError::config(format!(
                    "duplicate mount point: '{}'",
                    mount.proxy_path()
                )));
            }
        }

        mounts.sort_by(lookup_order);
        for mount in &mounts {
            tracing::info!("mounted '{}'", mount.proxy_path());
        }
        Ok(Self { mounts })
    }

    /// Mounts in lookup order.
    pub fn mounts(&self) -> &[MountWrapper] {
        &self.mounts
    }

    /// The mount that owns `path`.
    pub fn get_manager(&self, path: &str) -> ContentsResult<&MountWrapper> {
        let mount = self
            .mounts
            .iter()
            .find(|mount| mount.is_parent_directory_of(path))
            .ok_or_else(|| ContentsError::no_manager(path.to_string()))?;
        tracing::debug!("routing '{}' to mount '{}'", path, mount.proxy_path());
        Ok(mount)
    }

    /// Returns true if `path` is exactly some non-root mount's proxy path.
    pub fn is_mount_point(&self, path: &str) -> bool {
        let path = normalize(path);
        !path.is_empty() && self.mounts.iter().any(|mount| mount.proxy_path() == path)
    }

    fn has_root_mount(&self) -> bool {
        self.mounts.iter().any(|mount| mount.translator().is_root())
    }

    /// The namespace root when no mount owns it.
    fn virtual_root(opts: GetOptions) -> ContentsResult<ContentsModel> {
        if matches!(opts.kind, Some(ContentType::File | ContentType::Notebook)) {
            return Err(ContentsError::is_a_directory("/"));
        }
        let root = ContentsModel::directory("/");
        Ok(if opts.content {
            root.with_entries(Vec::new())
        } else {
            root
        })
    }

    /// Resolve a rename endpoint to its owner, refusing backing-less paths.
    fn rename_owner(&self, path: &str) -> ContentsResult<&MountWrapper> {
        if normalize(path).is_empty() {
            return Err(ContentsError::bad_request("cannot rename the namespace root"));
        }
        if self.is_mount_point(path) {
            return Err(ContentsError::bad_request(format!(
                "cannot rename mount point: '{}'",
                normalize(path)
            )));
        }
        self.get_manager(path).map_err(|_| {
            ContentsError::bad_request(format!("no storage behind path: '{}'", normalize(path)))
        })
    }

    /// Move one file, using the backend's own rename when both ends share a mount.
    async fn move_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        let source = self.get_manager(old_path)?;
        let target = self.get_manager(new_path)?;
        if source.proxy_path() == target.proxy_path() {
            return source.rename_file(old_path, new_path).await;
        }
        Self::transfer_file(source, target, old_path, new_path).await
    }

    /// Fetch, save on the target, then delete from the source.
    ///
    /// A failed delete leaves the copy in place and propagates the error.
    async fn transfer_file(
        source: &MountWrapper,
        target: &MountWrapper,
        old_path: &str,
        new_path: &str,
    ) -> ContentsResult<()> {
        tracing::debug!(
            "transfer '{}' ({}) -> '{}' ({})",
            old_path,
            source.proxy_path(),
            new_path,
            target.proxy_path()
        );
        let model = source.get(old_path, GetOptions::with_content()).await?;
        target.save(model, new_path).await?;
        if let Err(e) = source.delete_file(old_path).await {
            tracing::warn!(
                "copied '{}' to '{}' but could not delete the source: {}",
                old_path,
                new_path,
                e
            );
            return Err(e);
        }
        Ok(())
    }

    /// Move a directory tree entry by entry, hidden entries included.
    ///
    /// Directories are recreated on the destination, nested mount points are
    /// left where they are, and emptied source directories are removed
    /// deepest first. A source directory that still holds anything the walk
    /// could not move stays in place and its delete error propagates.
    async fn transfer_dir(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        let mut stack = vec![old_path.to_string()];
        let mut visited = Vec::new();
        let mut kept: Vec<String> = Vec::new();

        while let Some(dir) = stack.pop() {
            let target = rebase(&dir, old_path, new_path);
            self.get_manager(&target)?
                .save(ContentsModel::directory(target.as_str()), &target)
                .await?;

            let listing = self
                .get(&dir, GetOptions::with_content().include_hidden())
                .await?;
            for entry in listing.entries().unwrap_or_default() {
                if self.is_mount_point(&entry.path) {
                    tracing::debug!("leaving nested mount '{}' in place", entry.path);
                    kept.push(entry.path.clone());
                } else if entry.is_dir() {
                    stack.push(entry.path.clone());
                } else {
                    self.move_file(&entry.path, &rebase(&entry.path, old_path, new_path))
                        .await?;
                }
            }
            visited.push(dir);
        }

        // Pre-order reversed puts every directory after its descendants
        for dir in visited.iter().rev() {
            let prefix = format!("{}/", dir);
            if kept.iter().any(|mount| mount.starts_with(&prefix)) {
                continue;
            }
            if let Err(e) = self.get_manager(dir)?.delete_file(dir).await {
                tracing::warn!("moved contents of '{}' but could not remove it: {}", dir, e);
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Root last, then deeper first, then longer final segment first.
fn lookup_order(a: &MountWrapper, b: &MountWrapper) -> Ordering {
    let key = |m: &MountWrapper| {
        let t = m.translator();
        (t.is_root(), Reverse(t.depth()), Reverse(t.last_segment().len()))
    };
    key(a)
        .cmp(&key(b))
        .then_with(|| a.proxy_path().cmp(b.proxy_path()))
}

/// Replace the `old` prefix of `path` with `new`.
fn rebase(path: &str, old: &str, new: &str) -> String {
    match normalize(path).strip_prefix(old) {
        Some(rest) => join(new, rest),
        None => normalize(path).to_string(),
    }
}

#[async_trait]
impl ContentsManager for MultiContentsManager {
    async fn get(&self, path: &str, opts: GetOptions) -> ContentsResult<ContentsModel> {
        let mut model = match self.get_manager(path) {
            Ok(mount) => mount.get(path, opts).await?,
            Err(_) if normalize(path).is_empty() => Self::virtual_root(opts)?,
            Err(e) => return Err(e),
        };

        if opts.content && model.is_dir() {
            let synthetic: Vec<ContentsModel> = self
                .mounts
                .iter()
                .filter(|mount| mount.is_sub_directory_of(path))
                .map(|mount| ContentsModel::directory(mount.to_proxy_path("")))
                .collect();
            if let Some(entries) = model.entries_mut() {
                if !synthetic.is_empty() {
                    tracing::debug!("merging {} mount points into '{}'", synthetic.len(), path);
                }
                entries.retain(|entry| !synthetic.iter().any(|s| s.path == entry.path));
                entries.extend(synthetic);
            }
        }
        Ok(model)
    }

    async fn file_exists(&self, path: &str) -> ContentsResult<bool> {
        self.get_manager(path)?.file_exists(path).await
    }

    async fn dir_exists(&self, path: &str) -> ContentsResult<bool> {
        if normalize(path).is_empty() && !self.has_root_mount() {
            return Ok(true);
        }
        self.get_manager(path)?.dir_exists(path).await
    }

    async fn is_hidden(&self, path: &str) -> ContentsResult<bool> {
        self.get_manager(path)?.is_hidden(path).await
    }

    async fn save(&self, model: ContentsModel, path: &str) -> ContentsResult<ContentsModel> {
        self.get_manager(path)?.save(model, path).await
    }

    async fn delete_file(&self, path: &str) -> ContentsResult<()> {
        self.get_manager(path)?.delete_file(path).await
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        let source = self.rename_owner(old_path)?;
        let target = self.rename_owner(new_path)?;
        let old_path = normalize(old_path);
        let new_path = normalize(new_path);

        if source.proxy_path() == target.proxy_path() {
            return source.rename_file(old_path, new_path).await;
        }

        if new_path.starts_with(&format!("{}/", old_path)) {
            return Err(ContentsError::bad_request(format!(
                "cannot move '{}' into itself",
                old_path
            )));
        }
        let model = source.get(old_path, GetOptions::metadata()).await?;
        if target.file_exists(new_path).await? || target.dir_exists(new_path).await? {
            return Err(ContentsError::already_exists(new_path.to_string()));
        }

        if model.is_dir() {
            self.transfer_dir(old_path, new_path).await?;
        } else {
            Self::transfer_file(source, target, old_path, new_path).await?;
        }
        tracing::info!(
            "moved '{}' ({}) to '{}' ({})",
            old_path,
            source.proxy_path(),
            new_path,
            target.proxy_path()
        );
        Ok(())
    }
}
