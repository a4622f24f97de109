//! Contents layer: notebook-server storage behind one virtual namespace.
//!
//! Key components:
//!
//! - [`ContentsManager`] - Capability set every backend (and the router) exposes
//! - [`MultiContentsManager`] - Routes operations to mounts based on path
//! - [`MountWrapper`] - One backend presented under a proxy path
//! - [`PathTranslator`] - Virtual ↔ actual path arithmetic for one mount
//! - [`BackendRegistry`] - Builds backends from configured names
//! - [`FileContentsManager`] - Local filesystem storage (with path security)
//! - [`MemoryContentsManager`] - In-memory storage (for scratch space, testing)
//!
//! ## Design Decisions
//!
//! - **Static mount list**: mounts are built and sorted once; routing never
//!   takes a lock.
//! - **Longest-prefix routing**: the router tries deeper mounts first and
//!   the root mount (`""`) last.
//! - **Synthetic directories**: mount points show up in their parent's
//!   listing even when no backend stores them.
//! - **Copy-then-delete across mounts**: a failed delete leaves a duplicate,
//!   never a loss.

pub mod backends;
mod error;
mod ops;
mod registry;
mod router;
#[cfg(test)]
mod testing;
mod translate;
mod types;
mod wrapper;

pub use backends::{FileContentsManager, MemoryContentsManager};
pub use error::{ContentsError, ContentsResult};
pub use ops::ContentsManager;
pub use registry::{
    BackendArgs, BackendConstructor, BackendRegistry, BackendSpec, optional_bool, optional_str,
    required_str,
};
pub use router::MultiContentsManager;
pub use translate::PathTranslator;
pub use types::{
    CheckpointModel, Content, ContentFormat, ContentType, ContentsModel, GetOptions,
    PLACEHOLDER_TIMESTAMP, is_hidden_path, join, name_of, normalize, placeholder_time,
};
pub use wrapper::MountWrapper;
