//! SQL generation for [`QueryFilter`].
//!
//! Every operand is bound through a `?` placeholder. Identifiers cannot be
//! bound, so field and table names are reduced to `[a-zA-Z0-9_$.]` before
//! they are spliced into the statement.

use serde_json::Value;
use tracing::debug;

use super::types::{FilterCondition, FilterGroup, FilterOperator, QueryFilter, QueryResult, SortSpec};
use crate::value::{is_truthy, to_js_string, to_list};

/// Compiles filters into parameterized SQLite statements.
///
/// The builder holds no state between calls; one instance can be shared
/// freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFilterBuilder;

impl QueryFilterBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a `SELECT` against `table` from `filter`.
    ///
    /// Never fails: parts of the filter that cannot be compiled are left
    /// out of the SQL and described in [`QueryResult::errors`].
    pub fn build(&self, table: &str, filter: &QueryFilter) -> QueryResult {
        let mut state = Compilation {
            errors: filter.rejected.clone(),
            ..Default::default()
        };
        let mut sql = format!("SELECT * FROM {}", sanitize_identifier(table));

        if let Some(group) = &filter.where_clause {
            let clause = state.group(group);
            if !clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clause);
            }
        }

        let order: Vec<String> = filter
            .sort
            .iter()
            .filter_map(|spec| state.sort(spec))
            .collect();
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = filter.limit.filter(|n| *n != 0) {
            sql.push_str(" LIMIT ?");
            state.params.push(Value::from(limit));
        }

        if let Some(offset) = filter.offset.filter(|n| *n != 0) {
            sql.push_str(" OFFSET ?");
            state.params.push(Value::from(offset));
        }

        debug!(
            table = %table,
            params = state.params.len(),
            errors = state.errors.len(),
            "compiled query filter"
        );

        QueryResult {
            sql,
            params: state.params,
            errors: state.errors,
        }
    }
}

/// Compile `filter` against `table` with a fresh builder.
pub fn build_query(table: &str, filter: &QueryFilter) -> QueryResult {
    QueryFilterBuilder::new().build(table, filter)
}

/// Turn a user-supplied field name into a safe SQL expression.
///
/// Characters outside `[a-zA-Z0-9_$.]` are dropped. A dotted name addresses
/// a path inside a JSON column: `meta.author.name` becomes
/// `json_extract(meta, '$.author.name')`. Returns `None` when nothing usable
/// remains.
pub fn sanitize_field_name(field: &str) -> Option<String> {
    let cleaned = sanitize_identifier(field);
    match cleaned.split_once('.') {
        Some(("", _)) => None,
        Some((column, path)) => Some(format!("json_extract({column}, '$.{path}')")),
        None if cleaned.is_empty() => None,
        None => Some(cleaned),
    }
}

fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
        .collect()
}

/// Per-call accumulators.
#[derive(Default)]
struct Compilation {
    params: Vec<Value>,
    errors: Vec<String>,
}

impl Compilation {
    fn group(&mut self, group: &FilterGroup) -> String {
        self.errors.extend(group.rejected.iter().cloned());
        let mut clauses = Vec::new();

        let and: Vec<String> = group
            .and
            .iter()
            .filter_map(|condition| self.condition(condition))
            .collect();
        if !and.is_empty() {
            clauses.push(format!("({})", and.join(" AND ")));
        }

        let or: Vec<String> = group
            .or
            .iter()
            .filter_map(|condition| self.condition(condition))
            .collect();
        if !or.is_empty() {
            clauses.push(format!("({})", or.join(" OR ")));
        }

        clauses.join(" AND ")
    }

    fn sort(&mut self, spec: &SortSpec) -> Option<String> {
        let Some(field) = sanitize_field_name(&spec.field) else {
            self.errors
                .push(format!("Invalid field name: {}", spec.field));
            return None;
        };
        let Some(direction) = spec.order.as_sql() else {
            self.errors
                .push(format!("Invalid sort order: {}", spec.order.as_str()));
            return None;
        };
        Some(format!("{field} {direction}"))
    }

    fn condition(&mut self, condition: &FilterCondition) -> Option<String> {
        let Some(field) = sanitize_field_name(&condition.field) else {
            self.errors
                .push(format!("Invalid field name: {}", condition.field));
            return None;
        };
        let value = &condition.value;

        let clause = match &condition.operator {
            FilterOperator::Equals if value.is_null() => format!("{field} IS NULL"),
            FilterOperator::Equals => self.bind(&field, "=", value),
            FilterOperator::NotEquals if value.is_null() => format!("{field} IS NOT NULL"),
            FilterOperator::NotEquals => self.bind(&field, "!=", value),
            FilterOperator::GreaterThan => self.bind(&field, ">", value),
            FilterOperator::GreaterThanEqual => self.bind(&field, ">=", value),
            FilterOperator::LessThan => self.bind(&field, "<", value),
            FilterOperator::LessThanEqual => self.bind(&field, "<=", value),
            FilterOperator::Like => {
                let text = to_js_string(value);
                let words: Vec<&str> = text.split_whitespace().collect();
                self.all_substrings(&field, words.into_iter().map(str::to_string))
            }
            FilterOperator::Contains => {
                self.params
                    .push(Value::String(format!("%{}%", to_js_string(value))));
                format!("{field} LIKE ?")
            }
            FilterOperator::In => self.membership(&field, "IN", value, "1=0"),
            FilterOperator::NotIn => self.membership(&field, "NOT IN", value, "1=1"),
            FilterOperator::All => {
                let values = to_list(value);
                self.all_substrings(&field, values.iter().map(to_js_string))
            }
            FilterOperator::Exists if is_truthy(value) => {
                format!("{field} IS NOT NULL AND {field} != ''")
            }
            FilterOperator::Exists => format!("({field} IS NULL OR {field} = '')"),
            op @ (FilterOperator::Near | FilterOperator::Within | FilterOperator::Intersects) => {
                self.errors.push(format!(
                    "'{op}' operator not supported in SQLite. Use spatial extension or application-level filtering."
                ));
                return None;
            }
            FilterOperator::Unknown(name) => {
                self.errors.push(format!("Unknown operator: {name}"));
                return None;
            }
        };

        Some(clause)
    }

    fn bind(&mut self, field: &str, comparison: &str, value: &Value) -> String {
        self.params.push(value.clone());
        format!("{field} {comparison} ?")
    }

    /// `field IN (?, ?, ...)`, or `empty` when the operand list is empty.
    fn membership(&mut self, field: &str, keyword: &str, value: &Value, empty: &str) -> String {
        let values = to_list(value);
        if values.is_empty() {
            return empty.to_string();
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.params.extend(values);
        format!("{field} {keyword} ({placeholders})")
    }

    /// `(field LIKE ? AND ...)` with one `%term%` per term, or `1=1` for none.
    fn all_substrings(&mut self, field: &str, terms: impl Iterator<Item = String>) -> String {
        let clauses: Vec<String> = terms
            .map(|term| {
                self.params.push(Value::String(format!("%{term}%")));
                format!("{field} LIKE ?")
            })
            .collect();
        if clauses.is_empty() {
            return "1=1".to_string();
        }
        format!("({})", clauses.join(" AND "))
    }
}
