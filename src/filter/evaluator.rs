//! Evaluates filter conditions against documents.

use regex::RegexBuilder;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Once;

use super::ast::{
    Constraint, FilterCollection, FilterCondition, FilterField, FilterLogic, FilterOperator,
};
use super::expression::{date_constraint, is_date_only, parse_iso_timestamp, size_constraint};
use crate::markdown::normalize_tag;
use crate::models::Document;
use crate::utils::vault_relative;

static CREATED_UNSUPPORTED: Once = Once::new();

/// Evaluates [`FilterCondition`]s for documents of one vault
#[derive(Debug, Clone)]
pub struct FilterEvaluator {
    vault_root: PathBuf,
}

impl FilterEvaluator {
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        Self {
            vault_root: vault_root.into(),
        }
    }

    /// Evaluate one condition. Unknown fields or operators that do not fit
    /// the field evaluate to false.
    pub fn evaluate(&self, document: &Document, condition: &FilterCondition) -> bool {
        match condition.field {
            FilterField::Name => text_matches(&document.metadata.name, condition),
            FilterField::Content => text_matches(&document.content, condition),
            FilterField::Search => {
                let searchable = format!("{}\n{}", document.metadata.name, document.content);
                text_matches(&searchable, condition)
            }
            FilterField::Folders => self.folder_matches(document, condition),
            FilterField::Tags => tags_match(&document.metadata.tags, condition),
            FilterField::Metadata => metadata_matches(document, condition),
            FilterField::Modified => modified_matches(document, condition),
            FilterField::Created => {
                CREATED_UNSUPPORTED.call_once(|| {
                    tracing::warn!(
                        "Filtering on 'created' is not supported; such conditions never match"
                    );
                });
                false
            }
            FilterField::Size => size_matches(document.metadata.size, condition),
            FilterField::Unknown => {
                tracing::debug!(operator = ?condition.operator, "Unknown filter field");
                false
            }
        }
    }

    /// Combine the conditions of a collection; an empty collection passes
    pub fn evaluate_collection(&self, document: &Document, collection: &FilterCollection) -> bool {
        if collection.conditions.is_empty() {
            return true;
        }
        match collection.logic {
            FilterLogic::And => collection
                .conditions
                .iter()
                .all(|c| self.evaluate(document, c)),
            FilterLogic::Or => collection
                .conditions
                .iter()
                .any(|c| self.evaluate(document, c)),
        }
    }

    /// Keep the documents passing `collection`, in order
    pub fn apply_filters(
        &self,
        documents: Vec<Document>,
        collection: &FilterCollection,
    ) -> Vec<Document> {
        if collection.is_empty() {
            return documents;
        }
        let before = documents.len();
        let kept: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.evaluate_collection(doc, collection))
            .collect();
        tracing::debug!(before, after = kept.len(), "Applied filters");
        kept
    }

    fn folder_matches(&self, document: &Document, condition: &FilterCondition) -> bool {
        let folder = match vault_relative(&self.vault_root, document.parent_dir()) {
            Some(folder) => folder,
            None => return false,
        };
        let sensitive = condition.is_case_sensitive();
        let folder = fold_case(&folder, sensitive);

        // Plain prefix match: "Projects" also matches "Projects2"
        let any_match = string_list(&condition.value).iter().any(|wanted| {
            let wanted = fold_case(wanted.trim_matches('/'), sensitive);
            folder.starts_with(&wanted)
        });

        match condition.operator {
            FilterOperator::In => any_match,
            FilterOperator::NotIn => !any_match,
            _ => false,
        }
    }
}

fn fold_case(text: &str, sensitive: bool) -> String {
    if sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// A string, a number, or an array of either
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_matches(text: &str, condition: &FilterCondition) -> bool {
    let needle = match scalar_string(&condition.value) {
        Some(needle) => needle,
        None => return false,
    };
    let sensitive = condition.is_case_sensitive();

    if condition.operator == FilterOperator::Regex {
        return match RegexBuilder::new(&needle)
            .case_insensitive(!sensitive)
            .build()
        {
            Ok(re) => re.is_match(text),
            Err(e) => {
                tracing::debug!(pattern = %needle, error = %e, "Invalid filter regex");
                false
            }
        };
    }

    let haystack = fold_case(text, sensitive);
    let needle = fold_case(&needle, sensitive);
    match condition.operator {
        FilterOperator::Contains => haystack.contains(&needle),
        FilterOperator::NotContains => !haystack.contains(&needle),
        FilterOperator::Equals => haystack == needle,
        FilterOperator::NotEquals => haystack != needle,
        FilterOperator::StartsWith => haystack.starts_with(&needle),
        FilterOperator::EndsWith => haystack.ends_with(&needle),
        _ => false,
    }
}

fn tags_match(tags: &[String], condition: &FilterCondition) -> bool {
    let have: HashSet<String> = tags.iter().map(|t| normalize_tag(t)).collect();
    let wanted: Vec<String> = string_list(&condition.value)
        .iter()
        .map(|t| normalize_tag(t))
        .filter(|t| !t.is_empty())
        .collect();

    match condition.operator {
        FilterOperator::ContainsAny => wanted.iter().any(|t| have.contains(t)),
        FilterOperator::ContainsAll => wanted.iter().all(|t| have.contains(t)),
        FilterOperator::NotContains => !wanted.iter().any(|t| have.contains(t)),
        _ => false,
    }
}

fn metadata_matches(document: &Document, condition: &FilterCondition) -> bool {
    let key = match condition.key.as_deref() {
        Some(key) => key,
        None => return false,
    };
    let actual = document.metadata.frontmatter.get(key);
    match condition.operator {
        FilterOperator::Equals => actual == Some(&condition.value),
        FilterOperator::NotEquals => actual != Some(&condition.value),
        _ => false,
    }
}

fn modified_matches(document: &Document, condition: &FilterCondition) -> bool {
    let modified = document.metadata.modified;
    let text = match condition.value.as_str() {
        Some(text) => text,
        None => return false,
    };

    let (at, date_only) = match parse_iso_timestamp(text) {
        Some(at) => (at, is_date_only(text)),
        None => match date_constraint(text) {
            // The phrase supplies the bound; its own operator only applies
            // when the condition does not name a date comparison
            Constraint::Bound(predicate) if is_date_operator(condition.operator) => {
                (predicate.value, false)
            }
            constraint => return constraint.admits(|p| p.matches(modified)),
        },
    };

    let same_day = modified.date_naive() == at.date_naive();
    if date_only {
        let (day, wanted) = (modified.date_naive(), at.date_naive());
        return match condition.operator {
            FilterOperator::Equals => same_day,
            FilterOperator::NotEquals => !same_day,
            FilterOperator::Before => day < wanted,
            FilterOperator::After => day > wanted,
            FilterOperator::OnOrBefore => day <= wanted,
            FilterOperator::OnOrAfter => day >= wanted,
            _ => false,
        };
    }

    match condition.operator {
        FilterOperator::Equals => same_day,
        FilterOperator::NotEquals => !same_day,
        FilterOperator::Before => modified < at,
        FilterOperator::After => modified > at,
        FilterOperator::OnOrBefore => modified <= at,
        FilterOperator::OnOrAfter => modified >= at,
        _ => false,
    }
}

fn is_date_operator(operator: FilterOperator) -> bool {
    matches!(
        operator,
        FilterOperator::Equals
            | FilterOperator::NotEquals
            | FilterOperator::Before
            | FilterOperator::After
            | FilterOperator::OnOrBefore
            | FilterOperator::OnOrAfter
    )
}

fn size_matches(size: u64, condition: &FilterCondition) -> bool {
    let bound = match &condition.value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => return size_constraint(s).admits(|p| p.matches(size)),
        },
        _ => None,
    };
    let bound = match bound {
        Some(bound) => bound,
        None => return false,
    };

    let size = size as f64;
    match condition.operator {
        FilterOperator::Equals => size == bound,
        FilterOperator::NotEquals => size != bound,
        FilterOperator::GreaterThan => size > bound,
        FilterOperator::LessThan => size < bound,
        FilterOperator::GreaterThanOrEqual => size >= bound,
        FilterOperator::LessThanOrEqual => size <= bound,
        _ => false,
    }
}

/// Whether a date or size condition holds a phrase neither parser reads.
/// Such a condition lets every document through.
pub fn is_unconstrained(condition: &FilterCondition) -> bool {
    let text = match condition.value.as_str() {
        Some(text) => text,
        None => return false,
    };
    match condition.field {
        FilterField::Modified => {
            parse_iso_timestamp(text).is_none()
                && date_constraint(text) == Constraint::Unconstrained
        }
        FilterField::Size => {
            text.trim().parse::<f64>().is_err()
                && size_constraint(text) == Constraint::Unconstrained
        }
        _ => false,
    }
}
