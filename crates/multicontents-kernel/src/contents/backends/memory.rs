//! In-memory contents backend.
//!
//! Used for scratch mounts and testing. All data is ephemeral.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::SystemTime;

use super::Body;
use crate::contents::ops::ContentsManager;
use crate::contents::types::{ContentType, ContentsModel, GetOptions, is_hidden_path};
use crate::contents::{ContentsError, ContentsResult};

/// Entry in the memory tree.
#[derive(Debug, Clone)]
enum Entry {
    File {
        kind: ContentType,
        body: Body,
        created: SystemTime,
        modified: SystemTime,
    },
    Directory {
        created: SystemTime,
        modified: SystemTime,
    },
}

impl Entry {
    fn directory() -> Self {
        let now = SystemTime::now();
        Entry::Directory {
            created: now,
            modified: now,
        }
    }

    fn kind(&self) -> ContentType {
        match self {
            Entry::File { kind, .. } => *kind,
            Entry::Directory { .. } => ContentType::Directory,
        }
    }

    fn model(&self, path: &str) -> ContentsModel {
        let (created, modified) = match self {
            Entry::File {
                created, modified, ..
            }
            | Entry::Directory { created, modified } => (*created, *modified),
        };
        let mut model = ContentsModel::base(self.kind(), path);
        model.created = created;
        model.last_modified = modified;
        model
    }
}

/// In-memory contents manager.
///
/// Keys are normalized paths; `""` is the root directory and always exists.
#[derive(Debug)]
pub struct MemoryContentsManager {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for MemoryContentsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentsManager {
    /// Create a new empty in-memory tree.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(String::new(), Entry::directory());
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Normalize a path: drop empty and `.` segments, resolve `..`.
    fn normalize(path: &str) -> String {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        segments.join("/")
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    fn is_descendant(candidate: &str, ancestor: &str) -> bool {
        ancestor.is_empty()
            || candidate
                .strip_prefix(ancestor)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Ensure all parent directories exist.
    fn ensure_parents(entries: &mut HashMap<String, Entry>, path: &str) -> ContentsResult<()> {
        let mut current = String::new();
        let parent = Self::parent_of(path);
        if parent.is_empty() {
            return Ok(());
        }
        for segment in parent.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            match entries.get(&current) {
                Some(Entry::Directory { .. }) => {}
                Some(Entry::File { .. }) => {
                    return Err(ContentsError::not_a_directory(current));
                }
                None => {
                    entries.insert(current.clone(), Entry::directory());
                }
            }
        }
        Ok(())
    }

    fn list_children(
        entries: &HashMap<String, Entry>,
        dir: &str,
        hidden: bool,
    ) -> Vec<ContentsModel> {
        let mut children: Vec<ContentsModel> = entries
            .iter()
            .filter(|(path, _)| !path.is_empty() && path.as_str() != dir)
            .filter(|(path, _)| Self::parent_of(path) == dir)
            .filter(|(path, _)| hidden || !is_hidden_path(&path[dir.len()..]))
            .map(|(path, entry)| entry.model(path))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    fn get_sync(&self, path: &str, opts: GetOptions) -> ContentsResult<ContentsModel> {
        let entries = self.entries.read();
        let entry = entries
            .get(path)
            .ok_or_else(|| ContentsError::not_found(path.to_string()))?;

        match (opts.kind, entry) {
            (Some(ContentType::Directory), Entry::File { .. }) => {
                return Err(ContentsError::not_a_directory(path.to_string()));
            }
            (Some(ContentType::File | ContentType::Notebook), Entry::Directory { .. }) => {
                return Err(ContentsError::is_a_directory(path.to_string()));
            }
            _ => {}
        }

        let mut model = entry.model(path);
        if opts.content {
            match entry {
                Entry::Directory { .. } => {
                    model = model.with_entries(Self::list_children(&entries, path, opts.hidden));
                }
                Entry::File { body, .. } => body.fill(&mut model, opts.format)?,
            }
        }
        Ok(model)
    }

    fn save_sync(&self, model: ContentsModel, path: &str) -> ContentsResult<()> {
        let mut entries = self.entries.write();
        let existing = entries.get(path).cloned();

        if model.kind.is_dir() {
            return match existing {
                Some(Entry::Directory { .. }) => Ok(()),
                Some(Entry::File { .. }) => Err(ContentsError::bad_request(format!(
                    "{} exists and is not a directory",
                    path
                ))),
                None => {
                    Self::ensure_parents(&mut entries, path)?;
                    entries.insert(path.to_string(), Entry::directory());
                    Ok(())
                }
            };
        }

        if path.is_empty() || matches!(existing, Some(Entry::Directory { .. })) {
            return Err(ContentsError::is_a_directory(path.to_string()));
        }

        let kind = model.kind;
        let body = Body::from_model(model, path)?;
        let now = SystemTime::now();
        let created = match existing {
            Some(Entry::File { created, .. }) => created,
            _ => now,
        };

        Self::ensure_parents(&mut entries, path)?;
        entries.insert(
            path.to_string(),
            Entry::File {
                kind,
                body,
                created,
                modified: now,
            },
        );
        Ok(())
    }

    fn delete_sync(&self, path: &str) -> ContentsResult<()> {
        if path.is_empty() {
            return Err(ContentsError::permission_denied("cannot remove root"));
        }

        let mut entries = self.entries.write();
        match entries.get(path) {
            Some(Entry::File { .. }) => {
                entries.remove(path);
                Ok(())
            }
            Some(Entry::Directory { .. }) => {
                if entries.keys().any(|key| Self::is_descendant(key, path)) {
                    return Err(ContentsError::directory_not_empty(path.to_string()));
                }
                entries.retain(|key, _| key != path && !Self::is_descendant(key, path));
                Ok(())
            }
            None => Err(ContentsError::not_found(path.to_string())),
        }
    }

    fn rename_sync(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        if old_path.is_empty() || new_path.is_empty() {
            return Err(ContentsError::bad_request("cannot rename root"));
        }
        if old_path == new_path {
            return Ok(());
        }
        if Self::is_descendant(new_path, old_path) {
            return Err(ContentsError::bad_request(format!(
                "cannot move {} into itself",
                old_path
            )));
        }

        let mut entries = self.entries.write();
        if !entries.contains_key(old_path) {
            return Err(ContentsError::not_found(old_path.to_string()));
        }
        if entries.contains_key(new_path) {
            return Err(ContentsError::already_exists(new_path.to_string()));
        }

        Self::ensure_parents(&mut entries, new_path)?;

        let moved: Vec<String> = entries
            .keys()
            .filter(|key| key.as_str() == old_path || Self::is_descendant(key, old_path))
            .cloned()
            .collect();
        for key in moved {
            if let Some(entry) = entries.remove(&key) {
                let renamed = format!("{}{}", new_path, &key[old_path.len()..]);
                entries.insert(renamed, entry);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContentsManager for MemoryContentsManager {
    async fn get(&self, path: &str, opts: GetOptions) -> ContentsResult<ContentsModel> {
        self.get_sync(&Self::normalize(path), opts)
    }

    async fn file_exists(&self, path: &str) -> ContentsResult<bool> {
        let entries = self.entries.read();
        Ok(matches!(entries.get(&Self::normalize(path)), Some(Entry::File { .. })))
    }

    async fn dir_exists(&self, path: &str) -> ContentsResult<bool> {
        let entries = self.entries.read();
        Ok(matches!(
            entries.get(&Self::normalize(path)),
            Some(Entry::Directory { .. })
        ))
    }

    async fn is_hidden(&self, path: &str) -> ContentsResult<bool> {
        Ok(is_hidden_path(&Self::normalize(path)))
    }

    async fn save(&self, model: ContentsModel, path: &str) -> ContentsResult<ContentsModel> {
        let normalized = Self::normalize(path);
        tracing::trace!("memory save {} ({:?})", normalized, model.kind);
        self.save_sync(model, &normalized)?;
        self.get_sync(&normalized, GetOptions::metadata())
    }

    async fn delete_file(&self, path: &str) -> ContentsResult<()> {
        self.delete_sync(&Self::normalize(path))
    }

    async fn rename_file(&self, old_path: &str, new_path: &str) -> ContentsResult<()> {
        self.rename_sync(&Self::normalize(old_path), &Self::normalize(new_path))
    }
}
