use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use super::result::{OperationRecord, PipelineOutput, PipelineResult, PipelineState};
use super::spec::{OutputFormat, PipelineSpec};
use crate::config::VaultConfig;
use crate::filter::{is_unconstrained, FilterEvaluator};
use crate::models::Document;
use crate::operations::{
    FileOperation, Operation, OperationContext, OperationFactory, OperationOptions,
};
use crate::ports::{DocumentIndex, VaultFs};
use crate::selector::DocumentSelector;
use crate::utils::vault_relative;

/// Errors that stop a pipeline before it starts
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum PipelineError {
    /// Missing or malformed operation parameters
    #[error("Invalid pipeline: {0}")]
    Validation(String),
}

/// Runs pipelines against one vault
pub struct PipelineExecutor {
    config: VaultConfig,
    fs: Arc<dyn VaultFs>,
    index: Arc<dyn DocumentIndex>,
    selector: DocumentSelector,
    evaluator: FilterEvaluator,
}

impl PipelineExecutor {
    pub fn new(config: VaultConfig, fs: Arc<dyn VaultFs>, index: Arc<dyn DocumentIndex>) -> Self {
        let selector =
            DocumentSelector::new(config.vault_root.clone(), Arc::clone(&fs), Arc::clone(&index));
        let evaluator = FilterEvaluator::new(config.vault_root.clone());
        Self {
            config,
            fs,
            index,
            selector,
            evaluator,
        }
    }

    /// Run `spec`.
    ///
    /// Only validation errors are returned as `Err`; everything that goes
    /// wrong after that is recorded on the result.
    pub async fn run(&self, spec: &PipelineSpec) -> Result<PipelineResult, PipelineError> {
        spec.validate()?;

        let span = tracing::info_span!(
            "pipeline",
            run_id = %Uuid::new_v4(),
            destructive = spec.options.destructive
        );
        Ok(self.run_validated(spec).instrument(span).await)
    }

    async fn run_validated(&self, spec: &PipelineSpec) -> PipelineResult {
        let mut state = PipelineState::Idle;

        transition(&mut state, PipelineState::Selecting);
        let load_content = spec
            .filter
            .as_ref()
            .map(|f| f.needs_content())
            .unwrap_or(false);
        let selected = match self.selector.select(&spec.select, load_content).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!(error = %e, "Selection failed");
                transition(&mut state, PipelineState::Failed);
                return PipelineResult::selection_failed(e.to_string());
            }
        };

        transition(&mut state, PipelineState::Filtering);
        let mut documents = match &spec.filter {
            Some(filter) => {
                for condition in filter.conditions.iter().filter(|c| is_unconstrained(c)) {
                    tracing::warn!(
                        field = ?condition.field,
                        value = %condition.value,
                        "Unrecognised expression, condition ignored"
                    );
                }
                self.evaluator.apply_filters(selected, filter)
            }
            None => selected,
        };
        if let Some(max) = spec.options.max_documents {
            documents.truncate(max);
        }
        tracing::info!(documents = documents.len(), "Documents to process");

        transition(&mut state, PipelineState::Operating);
        let mut result = PipelineResult::new(documents.len());
        let operations: Vec<Box<dyn FileOperation>> =
            spec.operations.iter().map(OperationFactory::create).collect();

        let processed = if spec.options.destructive {
            self.execute(documents, &spec.operations, &operations, spec, &mut result)
                .await
        } else {
            self.preview(documents, &spec.operations, &operations, &mut result)
                .await
        };

        transition(&mut state, PipelineState::Formatting);
        result.output = Some(PipelineOutput {
            format: spec.output_format().unwrap_or(OutputFormat::List),
            documents: processed.iter().map(|d| self.display_path(&d.path)).collect(),
        });

        transition(&mut state, PipelineState::Done);
        result.state = state;
        tracing::info!(
            succeeded = result.operations.succeeded,
            failed = result.operations.failed,
            skipped = result.operations.skipped,
            "Pipeline finished"
        );
        result
    }

    /// Describe every pair without touching storage
    async fn preview(
        &self,
        documents: Vec<Document>,
        specs: &[Operation],
        operations: &[Box<dyn FileOperation>],
        result: &mut PipelineResult,
    ) -> Vec<Document> {
        let ctx = self.context(OperationOptions {
            dry_run: true,
            ..Default::default()
        });
        let mut processed = Vec::with_capacity(documents.len());

        for mut document in documents {
            for (spec, operation) in specs.iter().zip(operations) {
                let mut description = operation.describe(&document, &ctx);
                if spec.relocates() {
                    description.push_str(&self.reference_summary(&document, &ctx).await);
                }
                if let Err(e) = operation.validate(&document, &ctx) {
                    description.push_str(&format!(" (would fail: {})", e));
                }

                let target = operation.target_path(&document, &ctx);
                result.record_skip(OperationRecord {
                    document: self.display_path(&document.path),
                    operation: operation.kind().to_string(),
                    target_path: target.as_deref().map(|p| self.display_path(p)),
                    message: Some(format!("Preview mode: {}", description)),
                    links_updated: None,
                });

                // Later operations describe the document where it would be
                if let (true, Some(target)) = (spec.relocates(), target) {
                    document.relocate(target);
                }
            }
            processed.push(document);
        }

        processed
    }

    /// ` (N references in M files)` for a document about to move
    async fn reference_summary(&self, document: &Document, ctx: &OperationContext) -> String {
        match ctx.relocator().find_references(&document.path).await {
            Ok(references) => {
                let links: usize = references.iter().map(|r| r.links.len()).sum();
                format!(
                    " ({} {} in {} {})",
                    links,
                    if links == 1 { "reference" } else { "references" },
                    references.len(),
                    if references.len() == 1 { "file" } else { "files" }
                )
            }
            Err(e) => {
                tracing::warn!(
                    path = %document.path.display(),
                    error = %e,
                    "Reference scan failed"
                );
                String::new()
            }
        }
    }

    /// Apply every pair in order
    async fn execute(
        &self,
        documents: Vec<Document>,
        specs: &[Operation],
        operations: &[Box<dyn FileOperation>],
        spec: &PipelineSpec,
        result: &mut PipelineResult,
    ) -> Vec<Document> {
        let ctx = self.context(OperationOptions::default());
        let mut processed = Vec::with_capacity(documents.len());
        let mut halted = false;

        for mut document in documents {
            if halted {
                break;
            }

            for (op_spec, operation) in specs.iter().zip(operations) {
                let doc_path = self.display_path(&document.path);
                let outcome = match operation.validate(&document, &ctx) {
                    Ok(()) => operation.execute(&document, &ctx).await,
                    Err(e) => Err(e),
                };

                match outcome {
                    Ok(outcome) => {
                        tracing::debug!(
                            path = %doc_path,
                            operation = operation.kind(),
                            "Operation succeeded"
                        );
                        result.record_success(OperationRecord {
                            document: doc_path,
                            operation: operation.kind().to_string(),
                            target_path: outcome
                                .new_path
                                .as_deref()
                                .map(|p| self.display_path(p)),
                            message: Some(outcome.message),
                            links_updated: op_spec.relocates().then_some(outcome.links_updated),
                        });
                        if let Some(new_path) = outcome.new_path {
                            document.relocate(new_path);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %doc_path,
                            operation = operation.kind(),
                            error = %e,
                            "Operation failed"
                        );
                        result.record_failure(OperationRecord {
                            document: doc_path,
                            operation: operation.kind().to_string(),
                            target_path: None,
                            message: Some(e.to_string()),
                            links_updated: None,
                        });
                        if !spec.options.continue_on_error {
                            halted = true;
                            break;
                        }
                    }
                }
            }

            processed.push(document);
        }

        processed
    }

    fn context(&self, options: OperationOptions) -> OperationContext {
        OperationContext::new(
            self.config.clone(),
            Arc::clone(&self.fs),
            Arc::clone(&self.index),
            options,
        )
    }

    fn display_path(&self, path: &Path) -> String {
        vault_relative(&self.config.vault_root, path)
            .unwrap_or_else(|| path.display().to_string())
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = ?state, to = ?next, "Pipeline state");
    *state = next;
}
