use serde::{Deserialize, Serialize};

use super::spec::OutputFormat;

/// Phase the executor is in; the final value is kept on the result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineState {
    #[default]
    Idle,
    Selecting,
    Filtering,
    Operating,
    Formatting,
    Done,
    Failed,
}

/// One document x operation pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Vault-relative path of the document when the operation started
    pub document: String,
    /// Wire name of the operation
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_updated: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResults {
    pub succeeded: Vec<OperationRecord>,
    pub failed: Vec<OperationRecord>,
    pub skipped: Vec<OperationRecord>,
}

/// Paths of the processed documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub format: OutputFormat,
    pub documents: Vec<String>,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// No operation failed
    pub success: bool,
    /// Documents left after filtering and truncation
    pub documents_processed: usize,
    pub operations: OperationCounts,
    pub results: OperationResults,
    /// Error messages from failed operations
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PipelineOutput>,
    pub state: PipelineState,
}

impl PipelineResult {
    pub fn new(documents_processed: usize) -> Self {
        Self {
            success: true,
            documents_processed,
            ..Default::default()
        }
    }

    /// Selection blew up before any document was known
    pub fn selection_failed(message: String) -> Self {
        let mut result = Self::new(0);
        result.record_failure(OperationRecord {
            operation: "select".to_string(),
            message: Some(message),
            ..Default::default()
        });
        result.state = PipelineState::Failed;
        result
    }

    pub fn record_success(&mut self, record: OperationRecord) {
        self.operations.succeeded += 1;
        self.results.succeeded.push(record);
    }

    pub fn record_skip(&mut self, record: OperationRecord) {
        self.operations.skipped += 1;
        self.results.skipped.push(record);
    }

    /// Record a failure; its message also lands in `errors`
    pub fn record_failure(&mut self, record: OperationRecord) {
        let message = record.message.clone().unwrap_or_default();
        self.errors.push(if record.document.is_empty() {
            message
        } else {
            format!("{} ({}): {}", record.document, record.operation, message)
        });
        self.operations.failed += 1;
        self.results.failed.push(record);
        self.success = false;
    }
}
