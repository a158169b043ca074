//! Safe I/O utilities for in-place document rewrites
//!
//! Link relocation rewrites many files in one pass, so a crash half-way
//! through a write must never leave a truncated document behind. Writes go
//! to a temporary sibling, are fsynced, then renamed over the target.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Write data to a file atomically with fsync
///
/// 1. Writes data to a temporary file in the same directory
/// 2. Calls fsync on the file
/// 3. Atomically renames the temp file to the target
/// 4. Syncs the directory so the rename is durable
///
/// If any step fails, the temporary file is cleaned up.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Cannot determine parent directory for: {}", path.display()),
        )
    })?;

    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let temp_name = format!(
        ".{}.tmp.{}",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string()),
        std::process::id()
    );
    let temp_path = parent.join(&temp_name);

    let write_result = (|| -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    sync_directory(parent)
}

/// Sync a directory to ensure metadata changes are durable
///
/// On Windows, directory sync is not directly supported; the rename itself is
/// atomic on NTFS.
pub fn sync_directory(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        fs::File::open(path)?.sync_all()?;
    }

    #[cfg(windows)]
    {
        let _ = path;
    }

    Ok(())
}

/// Check if a path is a symlink without following it
pub fn is_symlink(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) => meta.is_symlink(),
        Err(_) => false,
    }
}

/// Move a file, falling back to copy + delete across filesystems
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    if fs::rename(source, destination).is_err() {
        fs::copy(source, destination)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.md");

        atomic_write(&path, b"Hello, World!").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Hello, World!");
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("test.md");

        atomic_write(&path, b"nested").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_move_file_creates_destination_parent() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.md");
        let dest = dir.path().join("Archive").join("2024").join("a.md");
        fs::write(&source, "content").unwrap();

        move_file(&source, &dest).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "content");
    }

    #[test]
    fn test_is_symlink() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.md");
        fs::write(&file, "content").unwrap();

        assert!(!is_symlink(&file));

        #[cfg(unix)]
        {
            let link = dir.path().join("link.md");
            std::os::unix::fs::symlink(&file, &link).unwrap();
            assert!(is_symlink(&link));
        }
    }
}
