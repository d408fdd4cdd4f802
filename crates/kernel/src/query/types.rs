//! Filter data model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::QueryError;

/// Comparison operator for a filter condition.
///
/// Operator names that are not recognized deserialize into
/// [`FilterOperator::Unknown`] so the compiler can report them instead of
/// rejecting the whole filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    /// Every whitespace-separated word must appear (substring match).
    Like,
    /// Substring match.
    Contains,
    In,
    NotIn,
    /// Every listed value must appear as a substring.
    All,
    /// Field is present and non-empty (or the reverse when the value is falsy).
    Exists,
    /// Spatial: unsupported by SQLite.
    Near,
    /// Spatial: unsupported by SQLite.
    Within,
    /// Spatial: unsupported by SQLite.
    Intersects,
    Unknown(String),
}

impl FilterOperator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanEqual => "greater_than_equal",
            Self::LessThan => "less_than",
            Self::LessThanEqual => "less_than_equal",
            Self::Like => "like",
            Self::Contains => "contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::All => "all",
            Self::Exists => "exists",
            Self::Near => "near",
            Self::Within => "within",
            Self::Intersects => "intersects",
            Self::Unknown(name) => name,
        }
    }
}

impl From<String> for FilterOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "greater_than_equal" => Self::GreaterThanEqual,
            "less_than" => Self::LessThan,
            "less_than_equal" => Self::LessThanEqual,
            "like" => Self::Like,
            "contains" => Self::Contains,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "all" => Self::All,
            "exists" => Self::Exists,
            "near" => Self::Near,
            "within" => Self::Within,
            "intersects" => Self::Intersects,
            _ => Self::Unknown(name),
        }
    }
}

impl From<FilterOperator> for String {
    fn from(operator: FilterOperator) -> Self {
        match operator {
            FilterOperator::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `field operator value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Column name, or `column.json.path` to reach into a JSON column.
    pub field: String,

    pub operator: FilterOperator,

    /// Operand; absent deserializes as `null`.
    #[serde(default)]
    pub value: Value,
}

impl FilterCondition {
    /// Create a condition.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Boolean grouping of conditions.
///
/// `and` conditions are conjoined, `or` conditions are disjoined, and the
/// two resulting clauses are conjoined with each other.
///
/// Entries are read one at a time: an entry that is not a valid condition
/// (missing `operator`, non-string `field`, ...) is dropped and described in
/// `rejected` while its siblings are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGroup")]
pub struct FilterGroup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<FilterCondition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<FilterCondition>,

    /// Entries that could not be read as conditions.
    #[serde(skip)]
    pub rejected: Vec<String>,
}

#[derive(Deserialize)]
struct RawGroup {
    #[serde(default)]
    and: Value,

    #[serde(default)]
    or: Value,
}

impl From<RawGroup> for FilterGroup {
    fn from(raw: RawGroup) -> Self {
        let mut rejected = Vec::new();
        let and = read_conditions("and", raw.and, &mut rejected);
        let or = read_conditions("or", raw.or, &mut rejected);
        Self { and, or, rejected }
    }
}

fn read_conditions(clause: &str, raw: Value, rejected: &mut Vec<String>) -> Vec<FilterCondition> {
    let items = match raw {
        Value::Null => return Vec::new(),
        Value::Array(items) => items,
        _ => {
            rejected.push(format!("Invalid condition list: '{clause}' must be an array"));
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(condition) => Some(condition),
            Err(e) => {
                rejected.push(format!("Invalid condition {clause}[{index}]: {e}"));
                None
            }
        })
        .collect()
}

/// Sort direction, accepted case-insensitively.
///
/// Any other string deserializes into [`SortOrder::Invalid`]; the compiler
/// skips that entry and reports it, so the text never reaches the SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
    Invalid(String),
}

impl SortOrder {
    /// Wire name of the direction.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
            Self::Invalid(raw) => raw,
        }
    }

    /// SQL keyword for this direction, `None` when it is not one.
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            Self::Asc => Some("ASC"),
            Self::Desc => Some("DESC"),
            Self::Invalid(_) => None,
        }
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Self::Asc,
            "desc" => Self::Desc,
            _ => Self::Invalid(value),
        }
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Invalid(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,

    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// A complete filter: conditions, sorting and pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<FilterGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,

    /// Pieces of the input dropped before compilation. The builder copies
    /// them into [`QueryResult::errors`].
    #[serde(skip)]
    pub rejected: Vec<String>,
}

/// Output of [`QueryFilterBuilder::build`](super::QueryFilterBuilder::build).
///
/// `params` line up with the `?` placeholders in `sql`, left to right.
/// `errors` lists the pieces of the filter that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub sql: String,
    pub params: Vec<Value>,
    pub errors: Vec<String>,
}

impl QueryResult {
    /// Whether every part of the filter compiled.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reject a result that skipped any part of its filter.
    pub fn ensure_valid(self) -> Result<Self, QueryError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(QueryError::InvalidFilter(self.errors))
        }
    }
}
