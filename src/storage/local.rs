use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::io::{atomic_write, is_symlink, move_file};
use crate::models::{DirEntry, FileStat};
use crate::ports::{FsError, VaultFs};

/// [`VaultFs`] backed by the local disk
#[derive(Debug, Clone, Default)]
pub struct LocalVaultFs;

impl LocalVaultFs {
    pub fn new() -> Self {
        Self
    }
}

/// Run blocking filesystem work off the async executor
async fn blocking<F>(path: &Path, f: F) -> Result<(), FsError>
where
    F: FnOnce() -> std::io::Result<()> + Send + 'static,
{
    let owned: PathBuf = path.to_path_buf();
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| FsError::from_io(&owned, e)),
        Err(join_err) => Err(FsError::Io {
            path: owned.display().to_string(),
            message: format!("Task failed: {}", join_err),
        }),
    }
}

#[async_trait]
impl VaultFs for LocalVaultFs {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(FileStat::from_metadata(&metadata))
    }

    async fn read_file(&self, path: &Path) -> Result<String, FsError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        let target = path.to_path_buf();
        let data = contents.as_bytes().to_vec();
        blocking(path, move || atomic_write(&target, &data)).await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            let entry_path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FsError::from_io(&entry_path, e))?;
            entries.push(DirEntry {
                is_directory: file_type.is_dir(),
                is_symlink: file_type.is_symlink() || is_symlink(&entry_path),
                path: entry_path,
            });
        }

        // Deterministic scan order regardless of platform listing order
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let source = from.to_path_buf();
        let destination = to.to_path_buf();
        blocking(from, move || move_file(&source, &destination)).await
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent).await?;
        }
        tokio::fs::copy(from, to)
            .await
            .map(|_| ())
            .map_err(|e| FsError::from_io(from, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_write_roundtrip_and_stat() {
        let dir = tempdir().unwrap();
        let fs = LocalVaultFs::new();
        let path = dir.path().join("Notes").join("a.md");

        fs.write_file(&path, "# Title\n").await.unwrap();

        assert!(fs.exists(&path).await);
        assert_eq!(fs.read_file(&path).await.unwrap(), "# Title\n");
        let stat = fs.stat(&path).await.unwrap();
        assert_eq!(stat.size, 8);
        assert!(stat.is_file);
    }

    #[tokio::test]
    async fn test_missing_file_maps_to_not_found() {
        let dir = tempdir().unwrap();
        let fs = LocalVaultFs::new();
        let err = fs.read_file(&dir.path().join("nope.md")).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_dir_sorted() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "").unwrap();
        std::fs::write(dir.path().join("a.md"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let entries = LocalVaultFs::new().read_dir(dir.path()).await.unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "sub"]);
        assert!(entries[2].is_directory);
    }

    #[tokio::test]
    async fn test_rename_and_copy() {
        let dir = tempdir().unwrap();
        let fs = LocalVaultFs::new();
        let a = dir.path().join("a.md");
        std::fs::write(&a, "x").unwrap();

        let b = dir.path().join("deep").join("b.md");
        fs.rename(&a, &b).await.unwrap();
        assert!(!a.exists());
        assert!(b.exists());

        let c = dir.path().join("copy").join("c.md");
        fs.copy(&b, &c).await.unwrap();
        assert!(b.exists());
        assert_eq!(std::fs::read_to_string(&c).unwrap(), "x");

        fs.remove_file(&b).await.unwrap();
        assert!(!fs.exists(&b).await);
    }
}
