use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::models::Document;

/// Errors surfaced by a [`DocumentIndex`] implementation
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum IndexError {
    /// The index cannot answer right now (not built, shut down)
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    /// The query itself could not be evaluated
    #[error("Query failed: {0}")]
    Query(String),
}

/// How a query dimension is matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum QueryMatcher {
    /// Value must equal exactly (strings compare case-insensitively)
    Exact(Value),
    /// Glob-style pattern with `*` and `?` wildcards
    Pattern(String),
}

/// One conjunct of a query: `field` matched by `matcher`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCondition {
    pub field: String,
    pub matcher: QueryMatcher,
}

impl QueryCondition {
    /// Build a condition, turning wildcard strings into pattern matchers
    pub fn from_criterion(field: &str, value: &Value) -> Self {
        let matcher = match value {
            Value::String(s) if s.contains('*') || s.contains('?') => {
                QueryMatcher::Pattern(s.clone())
            }
            other => QueryMatcher::Exact(other.clone()),
        };
        Self {
            field: field.to_string(),
            matcher,
        }
    }
}

impl QueryMatcher {
    /// Test a candidate string
    pub fn matches_str(&self, candidate: &str) -> bool {
        match self {
            QueryMatcher::Exact(Value::String(s)) => s.eq_ignore_ascii_case(candidate),
            QueryMatcher::Exact(Value::Number(n)) => n.to_string() == candidate,
            QueryMatcher::Exact(Value::Bool(b)) => b.to_string() == candidate,
            QueryMatcher::Exact(_) => false,
            QueryMatcher::Pattern(pattern) => glob_to_regex(pattern)
                .map(|re| re.is_match(candidate))
                .unwrap_or(false),
        }
    }

    /// Test a candidate JSON value; arrays match when any element matches
    pub fn matches_value(&self, candidate: &Value) -> bool {
        match (self, candidate) {
            (_, Value::Array(items)) => items.iter().any(|item| self.matches_value(item)),
            (QueryMatcher::Exact(expected), actual) if expected == actual => true,
            (_, Value::String(s)) => self.matches_str(s),
            (_, Value::Number(n)) => self.matches_str(&n.to_string()),
            (_, Value::Bool(b)) => self.matches_str(&b.to_string()),
            _ => false,
        }
    }
}

/// Compile a glob (`*`, `?`) into an anchored, case-insensitive regex
pub fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("(?i)^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

/// Query surface of the document index
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Documents satisfying every condition
    async fn query(&self, conditions: &[QueryCondition]) -> Result<Vec<Document>, IndexError>;

    /// Every indexed document
    async fn get_all_documents(&self) -> Result<Vec<Document>, IndexError>;

    /// Indexed metadata for one absolute path, if known
    async fn get_document(&self, path: &Path) -> Result<Option<Document>, IndexError>;

    /// Raw targets of the links leaving `path`
    async fn get_outgoing_links(&self, path: &Path) -> Result<Vec<String>, IndexError>;

    /// Absolute paths of the documents linking to `path`
    async fn get_backlinks(&self, path: &Path) -> Result<Vec<String>, IndexError>;
}
