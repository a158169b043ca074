//! Declarative filter conditions and the predicates they compile to.
//!
//! Conditions arrive as JSON (`{field, operator, value, key?, caseSensitive?}`)
//! and are evaluated against one document at a time. Field and operator names
//! that are not recognized deserialize into `Unknown` instead of failing, so a
//! bad condition rejects documents rather than aborting the whole run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document fields a condition can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// File stem
    Name,
    /// Full text
    Content,
    /// Name and content together
    Search,
    /// Containing directory, vault-relative
    Folders,
    Tags,
    /// Frontmatter value under `key`
    Metadata,
    Modified,
    /// Not tracked by the document model; always false
    Created,
    Size,
    #[serde(other)]
    Unknown,
}

/// Operators across all field families.
///
/// Which operators apply depends on the field; a mismatch evaluates to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    // Text
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    Regex,
    // Folders
    In,
    NotIn,
    // Tags
    ContainsAny,
    ContainsAll,
    // Dates
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    // Sizes
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    #[serde(other)]
    Unknown,
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub field: FilterField,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    /// Frontmatter key for `metadata` conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

impl FilterCondition {
    pub fn new(field: FilterField, operator: FilterOperator, value: Value) -> Self {
        Self {
            field,
            operator,
            value,
            key: None,
            case_sensitive: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = Some(sensitive);
        self
    }

    /// Text comparisons ignore case unless asked otherwise
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive.unwrap_or(false)
    }

    /// Whether evaluating this condition needs the document body
    pub fn needs_content(&self) -> bool {
        matches!(self.field, FilterField::Content | FilterField::Search)
    }
}

/// How the conditions of a collection combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterLogic {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

/// A set of conditions; empty means everything passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCollection {
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub logic: FilterLogic,
}

impl FilterCollection {
    pub fn all(conditions: Vec<FilterCondition>) -> Self {
        Self {
            conditions,
            logic: FilterLogic::And,
        }
    }

    pub fn any(conditions: Vec<FilterCondition>) -> Self {
        Self {
            conditions,
            logic: FilterLogic::Or,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn needs_content(&self) -> bool {
        self.conditions.iter().any(FilterCondition::needs_content)
    }
}

/// Comparison operator of a parsed predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "=")]
    Eq,
}

impl ComparisonOp {
    /// Parse operator from its symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "<" => Some(ComparisonOp::Lt),
            ">" => Some(ComparisonOp::Gt),
            "<=" => Some(ComparisonOp::Lte),
            ">=" => Some(ComparisonOp::Gte),
            "=" | "==" => Some(ComparisonOp::Eq),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Eq => "=",
        }
    }

    /// Mirror the operator. Turns an age comparison (`< 7 days` old) into a
    /// timestamp comparison (`>` now minus 7 days).
    pub fn invert(&self) -> Self {
        match self {
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::Lte => ComparisonOp::Gte,
            ComparisonOp::Gte => ComparisonOp::Lte,
            ComparisonOp::Eq => ComparisonOp::Eq,
        }
    }

    /// `actual <op> bound`
    pub fn compare<T: PartialOrd>(&self, actual: &T, bound: &T) -> bool {
        match self {
            ComparisonOp::Lt => actual < bound,
            ComparisonOp::Gt => actual > bound,
            ComparisonOp::Lte => actual <= bound,
            ComparisonOp::Gte => actual >= bound,
            ComparisonOp::Eq => actual == bound,
        }
    }
}

/// Parsed date expression: a single timestamp bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePredicate {
    pub operator: ComparisonOp,
    pub value: DateTime<Utc>,
}

impl DatePredicate {
    pub fn matches(&self, timestamp: DateTime<Utc>) -> bool {
        self.operator.compare(&timestamp, &self.value)
    }

    /// Bound rendered as an ISO-8601 timestamp
    pub fn iso_value(&self) -> String {
        self.value.to_rfc3339()
    }
}

/// Parsed size expression: a single byte-count bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePredicate {
    pub operator: ComparisonOp,
    pub bytes: u64,
}

impl SizePredicate {
    pub fn matches(&self, size: u64) -> bool {
        self.operator.compare(&size, &self.bytes)
    }
}

/// Outcome of turning free text into a predicate.
///
/// Text that cannot be parsed places no constraint on the document. This is a
/// different outcome from a condition that evaluates to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint<P> {
    Bound(P),
    Unconstrained,
}

impl<P> Constraint<P> {
    pub fn from_parsed(parsed: Option<P>) -> Self {
        match parsed {
            Some(predicate) => Constraint::Bound(predicate),
            None => Constraint::Unconstrained,
        }
    }

    /// Apply the bound, letting everything through when there is none
    pub fn admits(&self, test: impl FnOnce(&P) -> bool) -> bool {
        match self {
            Constraint::Bound(predicate) => test(predicate),
            Constraint::Unconstrained => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_parsing() {
        let cond: FilterCondition = serde_json::from_value(json!({
            "field": "metadata",
            "key": "status",
            "operator": "equals",
            "value": "draft"
        }))
        .unwrap();
        assert_eq!(cond.field, FilterField::Metadata);
        assert_eq!(cond.operator, FilterOperator::Equals);
        assert_eq!(cond.key.as_deref(), Some("status"));
        assert!(!cond.is_case_sensitive());
    }

    #[test]
    fn test_unknown_names_do_not_fail() {
        let cond: FilterCondition = serde_json::from_value(json!({
            "field": "colour",
            "operator": "resembles",
            "value": "red"
        }))
        .unwrap();
        assert_eq!(cond.field, FilterField::Unknown);
        assert_eq!(cond.operator, FilterOperator::Unknown);
    }

    #[test]
    fn test_collection_defaults() {
        let coll: FilterCollection = serde_json::from_value(json!({})).unwrap();
        assert!(coll.is_empty());
        assert_eq!(coll.logic, FilterLogic::And);

        let coll: FilterCollection =
            serde_json::from_value(json!({"conditions": [], "logic": "OR"})).unwrap();
        assert_eq!(coll.logic, FilterLogic::Or);
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(ComparisonOp::from_symbol(">="), Some(ComparisonOp::Gte));
        assert_eq!(ComparisonOp::from_symbol("=>"), None);
        assert_eq!(ComparisonOp::Lt.invert(), ComparisonOp::Gt);
        assert_eq!(ComparisonOp::Gte.invert(), ComparisonOp::Lte);
        assert_eq!(serde_json::to_value(ComparisonOp::Lte).unwrap(), json!("<="));
        assert!(ComparisonOp::Lte.compare(&3, &3));
        assert!(!ComparisonOp::Lt.compare(&3, &3));
    }

    #[test]
    fn test_constraint_admits() {
        let bound = Constraint::Bound(SizePredicate {
            operator: ComparisonOp::Gt,
            bytes: 10,
        });
        assert!(bound.admits(|p| p.matches(11)));
        assert!(!bound.admits(|p| p.matches(10)));

        let open: Constraint<SizePredicate> = Constraint::from_parsed(None);
        assert!(open.admits(|p| p.matches(0)));
    }
}
