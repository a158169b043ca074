use async_trait::async_trait;
use std::path::PathBuf;

use super::{FileOperation, OperationContext, OperationError, OperationOutcome};
use crate::models::Document;

/// Stand-in for `analyze`, `transform` and `aggregate`.
///
/// Validates so previews can list them, but never executes.
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedOperation {
    kind: &'static str,
}

impl UnimplementedOperation {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl FileOperation for UnimplementedOperation {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn validate(
        &self,
        _document: &Document,
        _ctx: &OperationContext,
    ) -> Result<(), OperationError> {
        Ok(())
    }

    fn describe(&self, document: &Document, ctx: &OperationContext) -> String {
        format!("{} {}", self.kind, ctx.display_path(&document.path))
    }

    fn target_path(&self, _document: &Document, _ctx: &OperationContext) -> Option<PathBuf> {
        None
    }

    async fn execute(
        &self,
        _document: &Document,
        _ctx: &OperationContext,
    ) -> Result<OperationOutcome, OperationError> {
        Err(OperationError::NotImplemented(self.kind.to_string()))
    }
}
