use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::backup::create_backup;
use super::{FileOperation, OperationContext, OperationError, OperationOutcome};
use crate::markdown::{parse_frontmatter, render_document, split_frontmatter};
use crate::models::Document;

/// Merge `updates` into a document's frontmatter and drop the `remove` keys.
///
/// Existing keys keep their position; new keys are appended. Removing every
/// key drops the block.
#[derive(Debug, Clone)]
pub struct UpdateFrontmatterOperation {
    updates: Map<String, Value>,
    remove: Vec<String>,
}

impl UpdateFrontmatterOperation {
    pub fn new(updates: Map<String, Value>, remove: Vec<String>) -> Self {
        Self { updates, remove }
    }

    /// Apply the change to `content`, returning `None` when nothing changes
    pub fn apply(&self, content: &str) -> Result<Option<String>, OperationError> {
        let mut frontmatter = parse_frontmatter(content)?;
        let original = frontmatter.clone();

        for (key, value) in &self.updates {
            frontmatter.insert(key.clone(), value.clone());
        }
        for key in &self.remove {
            frontmatter.remove(key);
        }

        if frontmatter == original {
            return Ok(None);
        }

        let body = split_frontmatter(content).body;
        Ok(Some(render_document(&frontmatter, body)?))
    }
}

#[async_trait]
impl FileOperation for UpdateFrontmatterOperation {
    fn kind(&self) -> &'static str {
        "updateFrontmatter"
    }

    fn validate(&self, document: &Document, ctx: &OperationContext) -> Result<(), OperationError> {
        if self.updates.is_empty() && self.remove.is_empty() {
            return Err(OperationError::Validation(
                "updateFrontmatter requires updates or remove".to_string(),
            ));
        }
        ctx.check_writable(&document.path)
    }

    fn describe(&self, document: &Document, ctx: &OperationContext) -> String {
        let mut parts = Vec::new();
        if !self.updates.is_empty() {
            let keys: Vec<&str> = self.updates.keys().map(String::as_str).collect();
            parts.push(format!("set {}", keys.join(", ")));
        }
        if !self.remove.is_empty() {
            parts.push(format!("remove {}", self.remove.join(", ")));
        }
        format!(
            "Update frontmatter of {}: {}",
            ctx.display_path(&document.path),
            parts.join("; ")
        )
    }

    fn target_path(&self, document: &Document, _ctx: &OperationContext) -> Option<PathBuf> {
        Some(document.path.clone())
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

        let content = ctx.fs.read_file(&document.path).await?;
        let updated = match self.apply(&content)? {
            Some(updated) => updated,
            None => {
                return Ok(OperationOutcome::message(format!(
                    "Frontmatter of {} already up to date",
                    ctx.display_path(&document.path)
                )));
            }
        };

        let backup = create_backup(ctx, &document.path).await?;
        ctx.fs.write_file(&document.path, &updated).await?;
        tracing::info!(path = %document.path.display(), "Updated frontmatter");

        Ok(OperationOutcome {
            new_path: None,
            message: description,
            links_updated: 0,
            backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::{context, document, write};
    use serde_json::json;
    use tempfile::tempdir;

    fn op(updates: Value, remove: &[&str]) -> UpdateFrontmatterOperation {
        let updates = match updates {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        UpdateFrontmatterOperation::new(updates, remove.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_apply_merges_and_removes() {
        let content = "---\ntitle: Plan\nstatus: draft\ndraft: true\n---\n# Plan\n";
        let updated = op(json!({"status": "done", "reviewed": 2}), &["draft"])
            .apply(content)
            .unwrap()
            .unwrap();
        assert_eq!(
            updated,
            "---\ntitle: Plan\nstatus: done\nreviewed: 2\n---\n# Plan\n"
        );
    }

    #[test]
    fn test_apply_adds_block_and_drops_empty_block() {
        let added = op(json!({"status": "new"}), &[]).apply("Body\n").unwrap().unwrap();
        assert_eq!(added, "---\nstatus: new\n---\nBody\n");

        let removed = op(json!({}), &["status"]).apply(&added).unwrap().unwrap();
        assert_eq!(removed, "Body\n");

        assert_eq!(op(json!({}), &["missing"]).apply("Body\n").unwrap(), None);
    }

    #[test]
    fn test_apply_rejects_broken_yaml() {
        let result = op(json!({"a": 1}), &[]).apply("---\n: [unclosed\n---\n");
        assert!(matches!(result, Err(OperationError::Frontmatter(_))));
    }

    #[tokio::test]
    async fn test_execute_writes_with_backup() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "Notes/a.md", "---\nstatus: draft\n---\ntext\n");
        let ctx = context(root);
        let doc = document(root, "Notes/a.md");

        let operation = op(json!({"status": "done"}), &[]);
        operation.validate(&doc, &ctx).unwrap();
        assert_eq!(
            operation.target_path(&doc, &ctx),
            Some(root.join("Notes/a.md"))
        );

        let outcome = operation.execute(&doc, &ctx).await.unwrap();
        assert_eq!(outcome.message, "Update frontmatter of Notes/a.md: set status");
        assert_eq!(
            std::fs::read_to_string(root.join("Notes/a.md")).unwrap(),
            "---\nstatus: done\n---\ntext\n"
        );

        let backup = outcome.backup.unwrap();
        assert_eq!(
            std::fs::read_to_string(backup).unwrap(),
            "---\nstatus: draft\n---\ntext\n"
        );
    }

    #[tokio::test]
    async fn test_dry_run_leaves_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "a.md", "x");
        let mut ctx = context(root);
        ctx.options.dry_run = true;
        let doc = document(root, "a.md");

        let outcome = op(json!({"k": "v"}), &["old"])
            .execute(&doc, &ctx)
            .await
            .unwrap();
        assert_eq!(
            outcome.message,
            "Dry run: Update frontmatter of a.md: set k; remove old"
        );
        assert_eq!(std::fs::read_to_string(root.join("a.md")).unwrap(), "x");
        assert!(!root.join(".backups").exists());
    }
}
