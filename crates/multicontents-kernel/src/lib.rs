//! # multicontents-kernel
//!
//! Serves several notebook contents backends under one virtual namespace.
//!
//! Each backend is mounted at a path prefix. The root listing shows the
//! root backend's own entries next to every top-level mount point, and a
//! rename that crosses mounts is carried out as copy-then-delete.
//!
//! - [`contents`] - Routing, path translation and the built-in backends
//! - [`checkpoints`] - Timestamped snapshots for the file backend
//! - [`config`] - TOML mount configuration

pub mod checkpoints;
pub mod config;
pub mod contents;

pub use checkpoints::{Checkpoints, MultiVersionsFileCheckpoints, NoOpCheckpoints};
pub use config::{ManagerConfig, MultiContentsConfig};
pub use contents::{
    BackendRegistry, BackendSpec, CheckpointModel, Content, ContentFormat, ContentType,
    ContentsError, ContentsManager, ContentsModel, ContentsResult, FileContentsManager,
    GetOptions, MemoryContentsManager, MountWrapper, MultiContentsManager, PathTranslator,
};
