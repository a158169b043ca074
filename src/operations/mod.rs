//! Document operations.
//!
//! [`Operation`] is the wire form of a step in a pipeline. The
//! [`OperationFactory`] turns each variant into a [`FileOperation`] that can
//! validate, describe and execute itself against one document.
//!
//! ## Modules
//! - `move_op` - move into a folder and rename (both relocate links)
//! - `update_frontmatter` - merge and remove frontmatter keys
//! - `delete` - move to the vault trash or remove permanently
//! - `backup` - timestamped copies taken before destructive edits
//! - `unimplemented` - analysis-only variants that always fail

pub mod backup;
pub mod delete;
pub mod move_op;
pub mod unimplemented;
pub mod update_frontmatter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::VaultConfig;
use crate::links::{LinkRelocator, RelocationError};
use crate::markdown::FrontmatterError;
use crate::models::Document;
use crate::ports::{DocumentIndex, FsError, VaultFs};
use crate::security::PathValidator;
use crate::utils::{normalize, resolve_in_vault, vault_relative};

pub use delete::DeleteOperation;
pub use move_op::{MoveOperation, RenameOperation};
pub use unimplemented::UnimplementedOperation;
pub use update_frontmatter::UpdateFrontmatterOperation;

/// Errors raised by a single operation on a single document
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum OperationError {
    /// Missing or malformed parameters
    #[error("Invalid operation: {0}")]
    Validation(String),

    /// Analysis-only operations have no mutation path
    #[error("Operation '{0}' is not yet implemented")]
    NotImplemented(String),

    #[error("Target already exists: {0}")]
    TargetExists(String),

    #[error("Path is outside the vault: {0}")]
    OutsideVault(String),

    #[error("Cannot modify protected path: {0}")]
    Protected(String),

    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Relocation(#[from] RelocationError),
}

/// A pipeline step, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// Move into `destination` (a folder, vault-relative unless absolute)
    Move {
        #[serde(default)]
        destination: String,
        #[serde(default)]
        overwrite: bool,
    },
    /// Rename in place; `newName` is used literally
    Rename {
        #[serde(default, rename = "newName")]
        new_name: String,
    },
    /// Set `updates` and drop `remove` keys
    UpdateFrontmatter {
        #[serde(default)]
        updates: Map<String, Value>,
        #[serde(default)]
        remove: Vec<String>,
    },
    /// Move to the vault trash, or remove when `permanent`
    Delete {
        #[serde(default)]
        permanent: bool,
    },
    Analyze {
        #[serde(default)]
        options: Value,
    },
    Transform {
        #[serde(default)]
        options: Value,
    },
    Aggregate {
        #[serde(default)]
        options: Value,
    },
}

impl Operation {
    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Move { .. } => "move",
            Operation::Rename { .. } => "rename",
            Operation::UpdateFrontmatter { .. } => "updateFrontmatter",
            Operation::Delete { .. } => "delete",
            Operation::Analyze { .. } => "analyze",
            Operation::Transform { .. } => "transform",
            Operation::Aggregate { .. } => "aggregate",
        }
    }

    /// Whether this operation changes a document's path
    pub fn relocates(&self) -> bool {
        matches!(self, Operation::Move { .. } | Operation::Rename { .. })
    }

    /// Check required parameters. Needs no I/O.
    pub fn validate(&self) -> Result<(), OperationError> {
        match self {
            Operation::Move { destination, .. } => {
                if destination.trim().is_empty() {
                    return Err(OperationError::Validation(
                        "move requires a destination".to_string(),
                    ));
                }
            }
            Operation::Rename { new_name } => {
                let name = new_name.trim();
                if name.is_empty() {
                    return Err(OperationError::Validation(
                        "rename requires newName".to_string(),
                    ));
                }
                if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
                    return Err(OperationError::Validation(format!(
                        "newName must be a plain file name: {}",
                        new_name
                    )));
                }
            }
            Operation::UpdateFrontmatter { updates, remove } => {
                if updates.is_empty() && remove.is_empty() {
                    return Err(OperationError::Validation(
                        "updateFrontmatter requires updates or remove".to_string(),
                    ));
                }
            }
            Operation::Delete { .. }
            | Operation::Analyze { .. }
            | Operation::Transform { .. }
            | Operation::Aggregate { .. } => {}
        }
        Ok(())
    }
}

/// Per-operation switches; distinct from the pipeline-level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationOptions {
    /// Describe instead of mutating
    pub dry_run: bool,
    /// Rewrite references after a move or rename
    pub update_links: bool,
    /// Copy the file aside before destructive edits
    pub create_backup: bool,
    pub continue_on_error: bool,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            update_links: true,
            create_backup: true,
            continue_on_error: false,
        }
    }
}

/// Everything an operation needs besides the document
#[derive(Clone)]
pub struct OperationContext {
    pub config: VaultConfig,
    pub fs: Arc<dyn VaultFs>,
    pub index: Arc<dyn DocumentIndex>,
    pub options: OperationOptions,
}

impl OperationContext {
    pub fn new(
        config: VaultConfig,
        fs: Arc<dyn VaultFs>,
        index: Arc<dyn DocumentIndex>,
        options: OperationOptions,
    ) -> Self {
        Self {
            config,
            fs,
            index,
            options,
        }
    }

    pub fn vault_root(&self) -> &Path {
        &self.config.vault_root
    }

    /// Resolve a user supplied path against the vault
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_in_vault(self.vault_root(), path)
    }

    /// Vault-relative display form, falling back to the full path
    pub fn display_path(&self, path: &Path) -> String {
        vault_relative(self.vault_root(), path).unwrap_or_else(|| path.display().to_string())
    }

    pub fn relocator(&self) -> LinkRelocator {
        LinkRelocator::new(
            self.vault_root().to_path_buf(),
            Arc::clone(&self.fs),
            self.config.relocation.clone(),
        )
    }

    /// Reject paths outside the vault, tool folders, and the trash and
    /// backup folders
    pub fn check_writable(&self, path: &Path) -> Result<(), OperationError> {
        let root = self.vault_root();
        if !PathValidator::is_within_vault(root, path) {
            return Err(OperationError::OutsideVault(path.display().to_string()));
        }
        let path = normalize(path);
        if PathValidator::is_protected_path(root, &path)
            || path.starts_with(normalize(&self.config.trash_root()))
            || path.starts_with(normalize(&self.config.backup_root()))
        {
            return Err(OperationError::Protected(self.display_path(&path)));
        }
        Ok(())
    }
}

/// What an executed operation did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    /// New location when the document moved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<PathBuf>,
    pub message: String,
    pub links_updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

impl OperationOutcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// An executable operation bound to its parameters
#[async_trait]
pub trait FileOperation: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Synchronous checks against the document and vault layout
    fn validate(&self, document: &Document, ctx: &OperationContext) -> Result<(), OperationError>;

    /// Human readable effect, used for previews and dry runs
    fn describe(&self, document: &Document, ctx: &OperationContext) -> String;

    /// Where the document ends up, if anywhere
    fn target_path(&self, document: &Document, ctx: &OperationContext) -> Option<PathBuf>;

    async fn execute(
        &self,
        document: &Document,
        ctx: &OperationContext,
    ) -> Result<OperationOutcome, OperationError>;
}

/// Builds a [`FileOperation`] for each [`Operation`] variant
pub struct OperationFactory;

impl OperationFactory {
    pub fn create(operation: &Operation) -> Box<dyn FileOperation> {
        match operation {
            Operation::Move {
                destination,
                overwrite,
            } => Box::new(MoveOperation::new(destination.clone(), *overwrite)),
            Operation::Rename { new_name } => Box::new(RenameOperation::new(new_name.clone())),
            Operation::UpdateFrontmatter { updates, remove } => Box::new(
                UpdateFrontmatterOperation::new(updates.clone(), remove.clone()),
            ),
            Operation::Delete { permanent } => Box::new(DeleteOperation::new(*permanent)),
            Operation::Analyze { .. }
            | Operation::Transform { .. }
            | Operation::Aggregate { .. } => {
                Box::new(UnimplementedOperation::new(operation.kind()))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_wire_format() {
        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"type": "move", "destination": "Archive"},
            {"type": "rename", "newName": "b.md"},
            {"type": "updateFrontmatter", "updates": {"status": "done"}},
            {"type": "delete", "permanent": true},
            {"type": "aggregate", "options": {"by": "tag"}}
        ]))
        .unwrap();

        assert_eq!(
            ops[0],
            Operation::Move {
                destination: "Archive".to_string(),
                overwrite: false
            }
        );
        assert_eq!(
            ops[1],
            Operation::Rename {
                new_name: "b.md".to_string()
            }
        );
        assert_eq!(ops[2].kind(), "updateFrontmatter");
        assert_eq!(ops[3], Operation::Delete { permanent: true });
        assert_eq!(ops[4].kind(), "aggregate");
        assert!(ops[0].relocates() && ops[1].relocates() && !ops[2].relocates());

        assert!(serde_json::from_value::<Operation>(json!({"type": "explode"})).is_err());
    }

    #[test]
    fn test_validation() {
        let missing_dest: Operation = serde_json::from_value(json!({"type": "move"})).unwrap();
        assert!(matches!(
            missing_dest.validate(),
            Err(OperationError::Validation(_))
        ));

        let nested = Operation::Rename {
            new_name: "sub/b.md".to_string(),
        };
        assert!(nested.validate().is_err());

        let empty = Operation::UpdateFrontmatter {
            updates: Map::new(),
            remove: vec![],
        };
        assert!(empty.validate().is_err());

        assert!(Operation::Delete { permanent: false }.validate().is_ok());
        assert!(Operation::Analyze { options: Value::Null }.validate().is_ok());
    }

    #[test]
    fn test_default_options() {
        let options = OperationOptions::default();
        assert!(!options.dry_run);
        assert!(options.update_links);
        assert!(options.create_backup);
        assert!(!options.continue_on_error);
    }

    #[test]
    fn test_check_writable() {
        let ctx = test_support::context(Path::new("/vault"));
        assert!(ctx.check_writable(Path::new("/vault/Notes/a.md")).is_ok());
        assert!(matches!(
            ctx.check_writable(Path::new("/other/a.md")),
            Err(OperationError::OutsideVault(_))
        ));
        assert!(matches!(
            ctx.check_writable(Path::new("/vault/.obsidian/a.md")),
            Err(OperationError::Protected(_))
        ));
        assert!(matches!(
            ctx.check_writable(Path::new("/vault/.trash/a.md")),
            Err(OperationError::Protected(_))
        ));
    }

    #[test]
    fn test_factory_dispatch() {
        let op = OperationFactory::create(&Operation::Transform {
            options: Value::Null,
        });
        assert_eq!(op.kind(), "transform");
        let op = OperationFactory::create(&Operation::Delete { permanent: false });
        assert_eq!(op.kind(), "delete");
    }
}
