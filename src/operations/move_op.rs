use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{FileOperation, OperationContext, OperationError, OperationOutcome};
use crate::models::Document;
use crate::ports::FsError;

/// Move a document into a folder, keeping its file name
#[derive(Debug, Clone)]
pub struct MoveOperation {
    destination: String,
    overwrite: bool,
}

impl MoveOperation {
    pub fn new(destination: impl Into<String>, overwrite: bool) -> Self {
        Self {
            destination: destination.into(),
            overwrite,
        }
    }

    fn target(&self, document: &Document, ctx: &OperationContext) -> PathBuf {
        ctx.resolve(&self.destination).join(document.file_name())
    }
}

#[async_trait]
impl FileOperation for MoveOperation {
    fn kind(&self) -> &'static str {
        "move"
    }

    fn validate(&self, document: &Document, ctx: &OperationContext) -> Result<(), OperationError> {
        if self.destination.trim().is_empty() {
            return Err(OperationError::Validation(
                "move requires a destination".to_string(),
            ));
        }
        ctx.check_writable(&document.path)?;
        ctx.check_writable(&self.target(document, ctx))
    }

    fn describe(&self, document: &Document, ctx: &OperationContext) -> String {
        format!(
            "Move {} to {}",
            ctx.display_path(&document.path),
            ctx.display_path(&self.target(document, ctx))
        )
    }

    fn target_path(&self, document: &Document, ctx: &OperationContext) -> Option<PathBuf> {
        Some(self.target(document, ctx))
    }

    async fn execute(
        &self,
        document: &Document,
        ctx: &OperationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let target = self.target(document, ctx);
        relocate(document, &target, self.overwrite, self.describe(document, ctx), ctx).await
    }
}

/// Rename a document in place
#[derive(Debug, Clone)]
pub struct RenameOperation {
    new_name: String,
}

impl RenameOperation {
    pub fn new(new_name: impl Into<String>) -> Self {
        Self {
            new_name: new_name.into(),
        }
    }

    fn target(&self, document: &Document) -> PathBuf {
        document.parent_dir().join(self.new_name.trim())
    }
}

#[async_trait]
impl FileOperation for RenameOperation {
    fn kind(&self) -> &'static str {
        "rename"
    }

    fn validate(&self, document: &Document, ctx: &OperationContext) -> Result<(), OperationError> {
        let name = self.new_name.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(OperationError::Validation(format!(
                "newName must be a plain file name: {:?}",
                self.new_name
            )));
        }
        ctx.check_writable(&document.path)?;
        ctx.check_writable(&self.target(document))
    }

    fn describe(&self, document: &Document, ctx: &OperationContext) -> String {
        format!(
            "Rename {} to {}",
            ctx.display_path(&document.path),
            self.new_name.trim()
        )
    }

    fn target_path(&self, document: &Document, _ctx: &OperationContext) -> Option<PathBuf> {
        Some(self.target(document))
    }

    async fn execute(
        &self,
        document: &Document,
        ctx: &OperationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let target = self.target(document);
        relocate(document, &target, false, self.describe(document, ctx), ctx).await
    }
}

/// Move `document` to `target` and rewrite the references to it
async fn relocate(
    document: &Document,
    target: &Path,
    overwrite: bool,
    description: String,
    ctx: &OperationContext,
) -> Result<OperationOutcome, OperationError> {
    if ctx.options.dry_run {
        return Ok(OperationOutcome::message(format!("Dry run: {}", description)));
    }

    let source = document.path.as_path();
    if source == target {
        return Ok(OperationOutcome {
            new_path: Some(target.to_path_buf()),
            message: format!("{} is already in place", ctx.display_path(source)),
            ..Default::default()
        });
    }

    if !ctx.fs.exists(source).await {
        return Err(FsError::NotFound(source.display().to_string()).into());
    }
    if !overwrite && ctx.fs.exists(target).await {
        return Err(OperationError::TargetExists(ctx.display_path(target)));
    }

    ctx.fs.rename(source, target).await?;
    tracing::info!(from = %source.display(), to = %target.display(), "Moved document");

    let links_updated = if ctx.options.update_links {
        let report = ctx.relocator().update_references(source, target).await?;
        report.links_updated
    } else {
        0
    };

    Ok(OperationOutcome {
        new_path: Some(target.to_path_buf()),
        message: description,
        links_updated,
        backup: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::{context, document, write};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_move_rewrites_links() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "Tasks/task1.md", "body\n");
        write(root, "Projects/p.md", "[[Tasks/task1]]\n");
        let ctx = context(root);
        let doc = document(root, "Tasks/task1.md");

        let op = MoveOperation::new("Archive/2024", false);
        op.validate(&doc, &ctx).unwrap();
        assert_eq!(op.describe(&doc, &ctx), "Move Tasks/task1.md to Archive/2024/task1.md");

        let outcome = op.execute(&doc, &ctx).await.unwrap();
        assert_eq!(outcome.new_path, Some(root.join("Archive/2024/task1.md")));
        assert_eq!(outcome.links_updated, 1);
        assert!(!root.join("Tasks/task1.md").exists());
        assert_eq!(
            std::fs::read_to_string(root.join("Projects/p.md")).unwrap(),
            "[[Archive/2024/task1]]\n"
        );
    }

    #[tokio::test]
    async fn test_move_refuses_existing_target() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a.md", "new");
        write(root, "Archive/a.md", "old");
        let ctx = context(root);
        let doc = document(root, "a.md");

        let result = MoveOperation::new("Archive", false).execute(&doc, &ctx).await;
        assert!(matches!(result, Err(OperationError::TargetExists(_))));
        assert!(root.join("a.md").exists());

        MoveOperation::new("Archive", true)
            .execute(&doc, &ctx)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(root.join("Archive/a.md")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_move_dry_run_and_no_links() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a.md", "x");
        write(root, "b.md", "[[a]]");
        let mut ctx = context(root);
        let doc = document(root, "a.md");

        ctx.options.dry_run = true;
        let outcome = MoveOperation::new("Sub", false).execute(&doc, &ctx).await.unwrap();
        assert_eq!(outcome.message, "Dry run: Move a.md to Sub/a.md");
        assert!(outcome.new_path.is_none());
        assert!(root.join("a.md").exists());

        ctx.options.dry_run = false;
        ctx.options.update_links = false;
        let outcome = MoveOperation::new("Sub", false).execute(&doc, &ctx).await.unwrap();
        assert_eq!(outcome.links_updated, 0);
        assert_eq!(std::fs::read_to_string(root.join("b.md")).unwrap(), "[[a]]");
    }

    #[tokio::test]
    async fn test_move_into_protected_folder_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a.md", "x");
        let ctx = context(root);
        let doc = document(root, "a.md");

        let result = MoveOperation::new(".obsidian", false).validate(&doc, &ctx);
        assert!(matches!(result, Err(OperationError::Protected(_))));
        let result = MoveOperation::new("../outside", false).validate(&doc, &ctx);
        assert!(matches!(result, Err(OperationError::OutsideVault(_))));
    }

    #[tokio::test]
    async fn test_rename_keeps_folder() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "Notes/old.md", "x");
        write(root, "Notes/index.md", "[o](old.md) and [[old]]");
        let ctx = context(root);
        let doc = document(root, "Notes/old.md");

        let op = RenameOperation::new("new.md");
        op.validate(&doc, &ctx).unwrap();
        assert_eq!(op.target_path(&doc, &ctx), Some(root.join("Notes/new.md")));

        let outcome = op.execute(&doc, &ctx).await.unwrap();
        assert_eq!(outcome.links_updated, 2);
        assert_eq!(
            std::fs::read_to_string(root.join("Notes/index.md")).unwrap(),
            "[o](new.md) and [[new]]"
        );
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a.md", "x");
        let ctx = context(root);
        let doc = document(root, "a.md");
        std::fs::remove_file(root.join("a.md")).unwrap();

        let result = RenameOperation::new("b.md").execute(&doc, &ctx).await;
        assert!(matches!(result, Err(OperationError::Fs(_))));
    }
}
