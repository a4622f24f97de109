//! Backend registry: contents manager constructors keyed by name.
//!
//! Mount configuration names its backend by a string (`manager_class`) and
//! passes a map of constructor arguments (`kwargs`). The registry turns the
//! pair into a live backend, validating required fields up front.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::backends::{FileContentsManager, MemoryContentsManager};
use super::ops::ContentsManager;
use super::{ContentsError, ContentsResult};

/// Constructor arguments for a backend.
pub type BackendArgs = Map<String, Value>;

/// Builds a backend from its constructor arguments.
pub type BackendConstructor = fn(&BackendArgs) -> ContentsResult<Arc<dyn ContentsManager>>;

/// A backend given either directly or by registered name.
#[derive(Clone)]
pub enum BackendSpec {
    /// An already-constructed backend.
    Instance(Arc<dyn ContentsManager>),
    /// A registered constructor name plus its arguments.
    Named {
        manager_class: String,
        kwargs: BackendArgs,
    },
}

impl BackendSpec {
    /// Spec for a registered backend.
    pub fn named(manager_class: impl Into<String>, kwargs: BackendArgs) -> Self {
        Self::Named {
            manager_class: manager_class.into(),
            kwargs,
        }
    }
}

impl fmt::Debug for BackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(<contents manager>)"),
            Self::Named {
                manager_class,
                kwargs,
            } => f
                .debug_struct("Named")
                .field("manager_class", manager_class)
                .field("kwargs", kwargs)
                .finish(),
        }
    }
}

/// Name → constructor table.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    constructors: BTreeMap<String, BackendConstructor>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `file` and `memory` backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("file", build_file);
        registry.register("FileContentsManager", build_file);
        registry.register("memory", build_memory);
        registry.register("MemoryContentsManager", build_memory);
        registry
    }

    /// Register (or replace) a constructor.
    pub fn register(&mut self, name: impl Into<String>, constructor: BackendConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Returns true if `name` has a constructor.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Build the backend registered as `name`.
    pub fn build(&self, name: &str, kwargs: &BackendArgs) -> ContentsResult<Arc<dyn ContentsManager>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ContentsError::UnknownBackend(name.to_string()))?;
        constructor(kwargs)
    }
}

/// Required string argument.
pub fn required_str<'a>(kwargs: &'a BackendArgs, key: &str) -> ContentsResult<&'a str> {
    match kwargs.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ContentsError::config(format!(
            "`{}` must be a string, got {}",
            key, other
        ))),
        None => Err(ContentsError::config(format!("missing required field `{}`", key))),
    }
}

/// Optional string argument.
pub fn optional_str<'a>(kwargs: &'a BackendArgs, key: &str) -> ContentsResult<Option<&'a str>> {
    match kwargs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_str(kwargs, key).map(Some),
    }
}

/// Optional boolean argument.
pub fn optional_bool(kwargs: &BackendArgs, key: &str) -> ContentsResult<Option<bool>> {
    match kwargs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ContentsError::config(format!(
            "`{}` must be a boolean, got {}",
            key, other
        ))),
    }
}

fn build_file(kwargs: &BackendArgs) -> ContentsResult<Arc<dyn ContentsManager>> {
    let root_dir = required_str(kwargs, "root_dir")?;
    let root_dir = PathBuf::from(shellexpand::tilde(root_dir).as_ref());
    if !root_dir.is_dir() {
        return Err(ContentsError::config(format!(
            "root_dir is not a directory: {}",
            root_dir.display()
        )));
    }

    let mut manager = if optional_bool(kwargs, "read_only")?.unwrap_or(false) {
        FileContentsManager::read_only(root_dir)
    } else {
        FileContentsManager::new(root_dir)
    };
    if let Some(checkpoint_dir) = optional_str(kwargs, "checkpoint_dir")? {
        manager = manager.with_checkpoint_dir(checkpoint_dir);
    }
    Ok(Arc::new(manager))
}

fn build_memory(_kwargs: &BackendArgs) -> ContentsResult<Arc<dyn ContentsManager>> {
    Ok(Arc::new(MemoryContentsManager::new()))
}
