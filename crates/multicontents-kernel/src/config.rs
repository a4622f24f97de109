//! Mount configuration.
//!
//! A TOML document maps each mount prefix to the backend serving it:
//!
//! ```toml
//! [managers.""]
//! manager_class = "file"
//! kwargs = { root_dir = "~/notebooks" }
//!
//! [managers.tmp]
//! manager_class = "memory"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::contents::{BackendArgs, BackendSpec, ContentsError, ContentsResult, normalize};

/// Backend for one mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Registered backend name, e.g. `"file"`.
    pub manager_class: String,
    /// Constructor arguments.
    #[serde(default)]
    pub kwargs: BackendArgs,
}

/// Mount prefix → backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiContentsConfig {
    /// Keyed by mount prefix; `""` (or `"/"`) is the root mount.
    #[serde(default)]
    pub managers: BTreeMap<String, ManagerConfig>,
}

impl MultiContentsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> ContentsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ContentsError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ContentsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ContentsError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!("loaded mount configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Reject prefixes that collide once slashes are stripped.
    pub fn validate(&self) -> ContentsResult<()> {
        let mut seen = HashSet::new();
        for prefix in self.managers.keys() {
            if !seen.insert(normalize(prefix)) {
                return Err(ContentsError::config(format!(
                    "duplicate mount point: '{}'",
                    normalize(prefix)
                )));
            }
        }
        Ok(())
    }

    /// One `(prefix, backend)` pair per mount.
    pub fn specs(&self) -> Vec<(String, BackendSpec)> {
        self.managers
            .iter()
            .map(|(prefix, manager)| {
                (
                    normalize(prefix).to_string(),
                    BackendSpec::named(&manager.manager_class, manager.kwargs.clone()),
                )
            })
            .collect()
    }
}
