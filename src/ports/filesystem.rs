use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

use crate::models::{DirEntry, FileStat};

/// Errors surfaced by a [`VaultFs`] implementation
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum FsError {
    /// The path does not exist
    #[error("Path not found: {0}")]
    NotFound(String),

    /// The process may not read or write the path
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A create/rename target is already taken
    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// Any other I/O failure, message preserved from the OS
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl FsError {
    /// Attach a path to a std I/O error
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        let display = path.display().to_string();
        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(display),
            ErrorKind::PermissionDenied => FsError::PermissionDenied(display),
            ErrorKind::AlreadyExists => FsError::AlreadyExists(display),
            _ => FsError::Io {
                path: display,
                message: err.to_string(),
            },
        }
    }
}

/// Storage primitives the pipeline needs from the vault
#[async_trait]
pub trait VaultFs: Send + Sync {
    /// Whether anything exists at `path`
    async fn exists(&self, path: &Path) -> bool;

    /// Size, modification time and kind of `path`
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    /// Read a UTF-8 text file
    async fn read_file(&self, path: &Path) -> Result<String, FsError>;

    /// Replace the contents of a text file, creating parent directories
    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// List the direct children of a directory
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;

    /// Move a file, creating the destination's parent directories
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Delete a single file
    async fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Create a directory and all missing parents
    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Copy a file, creating the destination's parent directories
    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_mapping() {
        let path = Path::new("/vault/a.md");
        assert!(matches!(
            FsError::from_io(path, io::Error::from(ErrorKind::NotFound)),
            FsError::NotFound(p) if p == "/vault/a.md"
        ));
        assert!(matches!(
            FsError::from_io(path, io::Error::from(ErrorKind::PermissionDenied)),
            FsError::PermissionDenied(_)
        ));

        let err = FsError::from_io(path, io::Error::new(ErrorKind::Other, "disk on fire"));
        assert!(err.to_string().contains("disk on fire"));
    }
}
