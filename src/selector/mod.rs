//! Document Selector
//!
//! Resolves selection criteria into concrete documents. Explicit file lists
//! work for files the index has never seen; query criteria are delegated to
//! the index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::models::Document;
use crate::ports::{DocumentIndex, FsError, IndexError, QueryCondition, VaultFs};
use crate::utils::{normalize, resolve_in_vault};

/// Errors that can occur while selecting documents
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum SelectionError {
    /// An explicitly listed path does not exist or is not a file
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Malformed selection object
    #[error("Invalid selection: {0}")]
    Invalid(String),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// What to select.
///
/// Deserializes from `{"all": true}`, `{"files": [...]}` or any other map of
/// query dimensions (`{"folder": "Projects", "status": "draft"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub enum SelectionCriteria {
    All,
    Files(Vec<String>),
    Query(Map<String, Value>),
}

impl TryFrom<Map<String, Value>> for SelectionCriteria {
    type Error = SelectionError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        if let Some(all) = map.get("all") {
            return match all {
                Value::Bool(true) => Ok(SelectionCriteria::All),
                _ => Err(SelectionError::Invalid("'all' must be true".to_string())),
            };
        }

        if let Some(files) = map.get("files") {
            let list = files
                .as_array()
                .ok_or_else(|| SelectionError::Invalid("'files' must be a list".to_string()))?;
            let paths = list
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        SelectionError::Invalid("'files' entries must be strings".to_string())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(SelectionCriteria::Files(paths));
        }

        Ok(SelectionCriteria::Query(map))
    }
}

impl From<SelectionCriteria> for Map<String, Value> {
    fn from(criteria: SelectionCriteria) -> Self {
        match criteria {
            SelectionCriteria::All => {
                let mut map = Map::new();
                map.insert("all".to_string(), Value::Bool(true));
                map
            }
            SelectionCriteria::Files(files) => {
                let mut map = Map::new();
                map.insert(
                    "files".to_string(),
                    Value::Array(files.into_iter().map(Value::String).collect()),
                );
                map
            }
            SelectionCriteria::Query(map) => map,
        }
    }
}

/// Resolves [`SelectionCriteria`] into documents
pub struct DocumentSelector {
    vault_root: PathBuf,
    fs: Arc<dyn VaultFs>,
    index: Arc<dyn DocumentIndex>,
}

impl DocumentSelector {
    pub fn new(
        vault_root: impl Into<PathBuf>,
        fs: Arc<dyn VaultFs>,
        index: Arc<dyn DocumentIndex>,
    ) -> Self {
        Self {
            vault_root: normalize(&vault_root.into()),
            fs,
            index,
        }
    }

    /// Select documents, reading their content when `load_content` is set
    pub async fn select(
        &self,
        criteria: &SelectionCriteria,
        load_content: bool,
    ) -> Result<Vec<Document>, SelectionError> {
        let mut documents = match criteria {
            SelectionCriteria::All => self.index.get_all_documents().await?,
            SelectionCriteria::Files(files) => self.select_files(files).await?,
            SelectionCriteria::Query(map) => {
                let conditions: Vec<QueryCondition> = map
                    .iter()
                    .filter(|(key, _)| key.as_str() != "files")
                    .map(|(key, value)| QueryCondition::from_criterion(key, value))
                    .collect();
                if conditions.is_empty() {
                    self.index.get_all_documents().await?
                } else {
                    self.index.query(&conditions).await?
                }
            }
        };

        if load_content {
            for doc in documents.iter_mut().filter(|d| d.content.is_empty()) {
                doc.content = self.fs.read_file(&doc.path).await?;
            }
        }

        tracing::debug!(count = documents.len(), "Selected documents");
        Ok(documents)
    }

    async fn select_files(&self, files: &[String]) -> Result<Vec<Document>, SelectionError> {
        let mut seen = HashSet::new();
        let mut documents = Vec::with_capacity(files.len());

        for file in files {
            let path = resolve_in_vault(&self.vault_root, file);
            if !seen.insert(path.clone()) {
                continue;
            }
            documents.push(self.load_file(&path).await?);
        }

        Ok(documents)
    }

    /// Indexed metadata when available, otherwise a document built from `stat`
    async fn load_file(&self, path: &Path) -> Result<Document, SelectionError> {
        if !self.fs.exists(path).await {
            return Err(SelectionError::NotFound(path.display().to_string()));
        }
        let stat = self.fs.stat(path).await?;
        if !stat.is_file {
            return Err(SelectionError::NotFound(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let indexed = match self.index.get_document(path).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Index lookup failed, using file stat"
                );
                None
            }
        };

        let mut document = match indexed {
            Some(mut doc) => {
                doc.metadata.size = stat.size;
                doc.metadata.modified = stat.modified;
                doc.metadata.outgoing_links =
                    self.index.get_outgoing_links(path).await.unwrap_or_default();
                doc.metadata.backlinks = self.index.get_backlinks(path).await.unwrap_or_default();
                doc
            }
            None => Document::from_stat(path, &stat),
        };
        document.path = path.to_path_buf();
        Ok(document)
    }
}
