//! Timestamped backups under the vault backup folder.
//!
//! `Notes/a.md` is copied to `<vault>/.backups/Notes/a.md.20240315093000.bak`.

use std::path::{Path, PathBuf};

use super::{OperationContext, OperationError};
use crate::utils::{timestamp_suffix, vault_relative};

/// Backup location for `path` at the current time
pub fn backup_path(ctx: &OperationContext, path: &Path) -> Result<PathBuf, OperationError> {
    let relative = vault_relative(ctx.vault_root(), path)
        .filter(|rel| !rel.is_empty())
        .ok_or_else(|| OperationError::OutsideVault(path.display().to_string()))?;
    Ok(ctx
        .config
        .backup_root()
        .join(format!("{}.{}.bak", relative, timestamp_suffix())))
}

/// Copy `path` aside when backups are enabled; returns where it went
pub async fn create_backup(
    ctx: &OperationContext,
    path: &Path,
) -> Result<Option<PathBuf>, OperationError> {
    if !ctx.options.create_backup {
        return Ok(None);
    }
    let destination = backup_path(ctx, path)?;
    ctx.fs.copy(path, &destination).await?;
    tracing::debug!(path = %path.display(), backup = %destination.display(), "Created backup");
    Ok(Some(destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::{context, write};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_backup_copies_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "Notes/a.md", "original");
        let ctx = context(root);

        let backup = create_backup(&ctx, &root.join("Notes/a.md"))
            .await
            .unwrap()
            .unwrap();

        assert!(backup.starts_with(root.join(".backups/Notes")));
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("a.md.") && name.ends_with(".bak"));
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_backup_disabled() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a.md", "x");
        let mut ctx = context(root);
        ctx.options.create_backup = false;

        assert_eq!(create_backup(&ctx, &root.join("a.md")).await.unwrap(), None);
        assert!(!root.join(".backups").exists());
    }
}
