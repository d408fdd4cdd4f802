//! Filter-to-SQL compiler.
//!
//! Turns untrusted, nested filter descriptions into parameterized SQLite
//! `SELECT` statements:
//! - Boolean `and`/`or` groups of field/operator/value conditions
//! - JSON column access through dotted field paths
//! - Sorting and pagination
//! - Graceful degradation for operators SQLite cannot express

mod builder;
mod error;
mod execute;
mod parse;
mod types;

pub use builder::{QueryFilterBuilder, build_query, sanitize_field_name};
pub use error::QueryError;
pub use execute::{JsonRow, fetch_filtered, fetch_rows};
pub use parse::{MAX_QUERY_LIMIT, parse_from_query, parse_from_query_with_limit};
pub use types::{
    FilterCondition, FilterGroup, FilterOperator, QueryFilter, QueryResult, SortOrder, SortSpec,
};
