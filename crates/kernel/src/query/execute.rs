//! Execution of compiled filters against SQLite.

use serde_json::{Map, Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use super::builder::build_query;
use super::error::QueryError;
use super::types::{QueryFilter, QueryResult};

/// A result row keyed by column name.
pub type JsonRow = Map<String, Value>;

/// Run a compiled query and return its rows as JSON objects.
///
/// Parameters are bound in order. Compilation errors in `result` are not
/// checked here; use [`QueryResult::ensure_valid`] or [`fetch_filtered`]
/// to reject partially compiled filters.
pub async fn fetch_rows(pool: &SqlitePool, result: &QueryResult) -> Result<Vec<JsonRow>, QueryError> {
    let query = bind_json_params(&result.params, sqlx::query(&result.sql));
    let rows = query.fetch_all(pool).await?;

    debug!(sql = %result.sql, rows = rows.len(), "executed filtered query");

    Ok(rows.iter().map(row_to_json).collect())
}

/// Compile `filter` against `table` and run it, rejecting filters that
/// did not compile cleanly.
pub async fn fetch_filtered(
    pool: &SqlitePool,
    table: &str,
    filter: &QueryFilter,
) -> Result<Vec<JsonRow>, QueryError> {
    let result = build_query(table, filter).ensure_valid()?;
    fetch_rows(pool, &result).await
}

/// Bind JSON parameter values to a sqlx query dynamically.
fn bind_json_params<'q>(
    params: &[Value],
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        match param {
            Value::String(s) => query = query.bind(s.clone()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query = query.bind(i);
                } else if let Some(f) = n.as_f64() {
                    query = query.bind(f);
                }
            }
            Value::Bool(b) => query = query.bind(*b),
            Value::Null => query = query.bind(Option::<String>::None),
            // Arrays/objects: bind as JSON text
            other => query = query.bind(other.to_string()),
        }
    }
    query
}

/// Convert a row to JSON using each value's SQLite storage class.
fn row_to_json(row: &SqliteRow) -> JsonRow {
    let mut map = Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => row
                    .try_get_unchecked::<i64, _>(idx)
                    .ok()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                "REAL" | "NUMERIC" => row
                    .try_get_unchecked::<f64, _>(idx)
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => row
                    .try_get_unchecked::<Vec<u8>, _>(idx)
                    .ok()
                    .map(|bytes| Value::String(hex::encode(bytes)))
                    .unwrap_or(Value::Null),
                // TEXT and everything else
                _ => row
                    .try_get_unchecked::<String, _>(idx)
                    .ok()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            },
            Err(_) => Value::Null,
        };
        map.insert(column.name().to_string(), value);
    }
    map
}
