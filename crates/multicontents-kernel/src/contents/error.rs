//! Contents error types.

use std::io;
use thiserror::Error;

/// Contents error type.
#[derive(Debug, Error)]
pub enum ContentsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// No mount owns the path.
    #[error("manager not found for path: '{0}'")]
    NoManager(String),

    /// Request cannot be honoured as stated.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend is read-only.
    #[error("contents manager is read-only")]
    ReadOnly,

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Path escapes root (security violation).
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No constructor registered under this name.
    #[error("unknown contents manager: {0}")]
    UnknownBackend(String),

    /// Invalid mount configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Notebook (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ContentsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NoManager error.
    pub fn no_manager(path: impl Into<String>) -> Self {
        Self::NoManager(path.into())
    }

    /// Create a BadRequest error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status a notebook server would answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::NoManager(_) => 404,
            Self::BadRequest(_)
            | Self::NotADirectory(_)
            | Self::IsADirectory(_)
            | Self::DirectoryNotEmpty(_)
            | Self::InvalidPath(_) => 400,
            Self::PermissionDenied(_) | Self::ReadOnly | Self::PathEscapesRoot(_) => 403,
            Self::AlreadyExists(_) => 409,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => 404,
                io::ErrorKind::PermissionDenied => 403,
                io::ErrorKind::AlreadyExists => 409,
                _ => 500,
            },
            Self::UnknownBackend(_) | Self::Config(_) | Self::Json(_) | Self::Other(_) => 500,
        }
    }

    /// Returns true for the 404 family.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

/// Contents result type.
pub type ContentsResult<T> = Result<T, ContentsError>;
