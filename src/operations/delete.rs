use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::backup::create_backup;
use super::{FileOperation, OperationContext, OperationError, OperationOutcome};
use crate::models::Document;
use crate::utils::{format_size, timestamp_suffix, vault_relative};

/// Move a document into the vault trash, or remove it outright
#[derive(Debug, Clone)]
pub struct DeleteOperation {
    permanent: bool,
}

impl DeleteOperation {
    pub fn new(permanent: bool) -> Self {
        Self { permanent }
    }

    /// `<vault>/<trash>/<vault-relative path>`
    fn trash_target(&self, document: &Document, ctx: &OperationContext) -> Option<PathBuf> {
        let relative = vault_relative(ctx.vault_root(), &document.path)?;
        Some(ctx.config.trash_root().join(relative))
    }
}

/// `a.md` becomes `a.<timestamp>.md`
fn with_timestamp(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, timestamp_suffix(), ext.to_string_lossy()),
        None => format!("{}.{}", stem, timestamp_suffix()),
    };
    path.with_file_name(name)
}

#[async_trait]
impl FileOperation for DeleteOperation {
    fn kind(&self) -> &'static str {
        "delete"
    }

    fn validate(&self, document: &Document, ctx: &OperationContext) -> Result<(), OperationError> {
        ctx.check_writable(&document.path)
    }

    fn describe(&self, document: &Document, ctx: &OperationContext) -> String {
        let path = ctx.display_path(&document.path);
        let size = format_size(document.metadata.size);
        if self.permanent {
            format!("Permanently delete {} ({})", path, size)
        } else {
            format!("Move {} ({}) to trash", path, size)
        }
    }

    fn target_path(&self, document: &Document, ctx: &OperationContext) -> Option<PathBuf> {
        if self.permanent {
            None
        } else {
            self.trash_target(document, ctx)
        }
    }

    async fn execute(
        &self,
        document: &Document,
        ctx: &OperationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let description = self.describe(document, ctx);
        if ctx.options.dry_run {
            return Ok(OperationOutcome::message(format!("Dry run: {}", description)));
        }

        if self.permanent {
            let backup = create_backup(ctx, &document.path).await?;
            ctx.fs.remove_file(&document.path).await?;
            tracing::info!(path = %document.path.display(), "Deleted document");
            return Ok(OperationOutcome {
                message: description,
                backup,
                ..Default::default()
            });
        }

        let mut target = self
            .trash_target(document, ctx)
            .ok_or_else(|| OperationError::OutsideVault(document.path.display().to_string()))?;
        if ctx.fs.exists(&target).await {
            target = with_timestamp(&target);
        }

        ctx.fs.rename(&document.path, &target).await?;
        tracing::info!(
            path = %document.path.display(),
            trash = %target.display(),
            "Moved document to trash"
        );

        Ok(OperationOutcome {
            new_path: Some(target),
            message: description,
            ..Default::default()
        })
    }
}
