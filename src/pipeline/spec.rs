use serde::{Deserialize, Serialize};

use super::executor::PipelineError;
use crate::filter::FilterCollection;
use crate::operations::Operation;
use crate::selector::SelectionCriteria;

/// A full pipeline request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub select: SelectionCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterCollection>,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<OutputSpec>,
    #[serde(default)]
    pub options: PipelineOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    List,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Pipeline-level switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    /// Apply operations instead of previewing them
    pub destructive: bool,
    /// Keep going after a failed operation
    pub continue_on_error: bool,
    /// Cap on the number of filtered documents operated on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_documents: Option<usize>,
}

impl PipelineSpec {
    pub fn new(select: SelectionCriteria, operations: Vec<Operation>) -> Self {
        Self {
            select,
            filter: None,
            operations,
            output: Vec::new(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_filter(mut self, filter: FilterCollection) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the spec before any I/O
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.operations.is_empty() {
            return Err(PipelineError::Validation(
                "pipeline has no operations".to_string(),
            ));
        }
        for (i, operation) in self.operations.iter().enumerate() {
            operation.validate().map_err(|e| {
                PipelineError::Validation(format!(
                    "operation {} ({}): {}",
                    i + 1,
                    operation.kind(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Output format requested first, if any
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output.first().map(|o| o.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_spec() {
        let spec: PipelineSpec = serde_json::from_value(json!({
            "select": {"files": ["a.md"]},
            "filter": {
                "conditions": [
                    {"field": "metadata", "operator": "equals", "key": "status", "value": "draft"}
                ],
                "logic": "OR"
            },
            "operations": [{"type": "move", "destination": "Archive"}],
            "output": [{"format": "json"}],
            "options": {"destructive": true, "maxDocuments": 5}
        }))
        .unwrap();

        assert_eq!(spec.select, SelectionCriteria::Files(vec!["a.md".to_string()]));
        assert_eq!(spec.filter.as_ref().unwrap().conditions.len(), 1);
        assert_eq!(spec.output_format(), Some(OutputFormat::Json));
        assert!(spec.options.destructive);
        assert!(!spec.options.continue_on_error);
        assert_eq!(spec.options.max_documents, Some(5));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let spec: PipelineSpec = serde_json::from_value(json!({
            "select": {"all": true},
            "operations": [{"type": "delete"}]
        }))
        .unwrap();
        assert_eq!(spec.options, PipelineOptions::default());
        assert!(spec.filter.is_none());
        assert_eq!(spec.output_format(), None);
    }

    #[test]
    fn test_validate_rejects_bad_operations() {
        let empty = PipelineSpec::new(SelectionCriteria::All, vec![]);
        assert!(matches!(empty.validate(), Err(PipelineError::Validation(_))));

        let spec: PipelineSpec = serde_json::from_value(json!({
            "select": {"all": true},
            "operations": [{"type": "delete"}, {"type": "rename"}]
        }))
        .unwrap();
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("operation 2 (rename)"));
    }
}
