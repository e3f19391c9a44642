//! Error types for snapshot and reconciliation operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building, hashing or reconciling a snapshot.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Hashing was requested for something that is not a regular file.
    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// The path already has an entry in the database.
    #[error("Already in database: {path} (use verify or update instead)")]
    AlreadyTracked { path: PathBuf },

    /// The path has no entry in the database.
    #[error("Not in database: {path} (use add first)")]
    UntrackedPath { path: PathBuf },

    /// The path cannot be stored because it is not valid UTF-8.
    #[error("Path is not valid UTF-8 and cannot be tracked: {path}")]
    NonUtf8Path { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory walker failed to read part of the tree.
    #[error("Walk error at {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// The database file could not be parsed or serialized.
    #[error("Database error in {path}: {source}")]
    Database {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted entry violates the entry invariants.
    #[error("Invalid entry: {message}")]
    InvalidEntry { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl WardenError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid entry error.
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Fail with [`WardenError::NonUtf8Path`] unless `path` is valid UTF-8.
    pub fn require_utf8(path: &std::path::Path) -> Result<(), Self> {
        match path.to_str() {
            Some(_) => Ok(()),
            None => Err(Self::NonUtf8Path {
                path: path.to_path_buf(),
            }),
        }
    }

    /// The path this error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::NotAFile { path }
            | Self::AlreadyTracked { path }
            | Self::UntrackedPath { path }
            | Self::NonUtf8Path { path }
            | Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Walk { path, .. }
            | Self::Database { path, .. } => Some(path),
            Self::InvalidEntry { .. } | Self::InvalidConfig { .. } => None,
        }
    }
}
