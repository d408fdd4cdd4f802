//! Query-string adapter for list endpoints.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use super::types::{FilterCondition, FilterGroup, FilterOperator, QueryFilter, SortSpec};

/// Upper bound applied to `limit` taken from a query string.
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// Query parameters that map directly onto an `equals` condition.
const SIMPLE_FIELDS: &[&str] = &["status", "collection_id"];

/// Build a [`QueryFilter`] from query-string parameters, capping `limit` at
/// [`MAX_QUERY_LIMIT`].
///
/// Recognized keys:
/// - `where`: JSON [`FilterGroup`]
/// - `status`, `collection_id`: shorthand `equals` conditions
/// - `limit`, `offset`: integers
/// - `sort`: JSON array of `{field, order}`
///
/// Malformed pieces are logged, left out of the filter and recorded in
/// [`QueryFilter::rejected`], so the compiled result carries them as errors.
pub fn parse_from_query(query: &HashMap<String, String>) -> QueryFilter {
    parse_from_query_with_limit(query, MAX_QUERY_LIMIT)
}

/// Same as [`parse_from_query`] with a caller-chosen limit cap.
pub fn parse_from_query_with_limit(query: &HashMap<String, String>, max_limit: i64) -> QueryFilter {
    let mut filter = QueryFilter::default();

    if let Some(raw) = param(query, "where") {
        match serde_json::from_str::<FilterGroup>(raw) {
            Ok(group) => filter.where_clause = Some(group),
            Err(e) => {
                warn!(error = %e, "failed to parse where clause");
                filter.rejected.push(format!("Invalid where clause: {e}"));
            }
        }
    }

    for field in SIMPLE_FIELDS {
        if let Some(value) = param(query, field) {
            filter
                .where_clause
                .get_or_insert_with(FilterGroup::default)
                .and
                .push(FilterCondition::new(
                    *field,
                    FilterOperator::Equals,
                    Value::String(value.to_string()),
                ));
        }
    }

    if let Some(limit) = param(query, "limit").and_then(parse_leading_int) {
        filter.limit = Some(limit.min(max_limit));
    }

    if let Some(offset) = param(query, "offset").and_then(parse_leading_int) {
        filter.offset = Some(offset);
    }

    if let Some(raw) = param(query, "sort") {
        match serde_json::from_str::<Vec<Value>>(raw) {
            Ok(entries) => filter.sort = read_sort(entries, &mut filter.rejected),
            Err(e) => {
                warn!(error = %e, "failed to parse sort clause");
                filter.rejected.push(format!("Invalid sort clause: {e}"));
            }
        }
    }

    filter
}

fn read_sort(entries: Vec<Value>, rejected: &mut Vec<String>) -> Vec<SortSpec> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(spec) => Some(spec),
            Err(e) => {
                warn!(index, error = %e, "skipping sort entry");
                rejected.push(format!("Invalid sort entry {index}: {e}"));
                None
            }
        })
        .collect()
}

fn param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Parse an optionally signed leading run of digits, ignoring whatever
/// follows (`"25abc"` is 25). Returns `None` when no digits lead.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let n: i64 = unsigned[..end].parse().ok()?;
    Some(if negative { -n } else { n })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::SortOrder;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn empty_query_is_empty_filter() {
        assert_eq!(parse_from_query(&HashMap::new()), QueryFilter::default());
    }

    #[test]
    fn limit_is_clamped() {
        let filter = parse_from_query(&query(&[("limit", "5000"), ("offset", "40")]));
        assert_eq!(filter.limit, Some(MAX_QUERY_LIMIT));
        assert_eq!(filter.offset, Some(40));

        let filter = parse_from_query_with_limit(&query(&[("limit", "500")]), 100);
        assert_eq!(filter.limit, Some(100));
    }

    #[test]
    fn integers_parse_leniently() {
        assert_eq!(parse_leading_int("25abc"), Some(25));
        assert_eq!(parse_leading_int("  -3"), Some(-3));
        assert_eq!(parse_leading_int("+8"), Some(8));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int("-"), None);

        let filter = parse_from_query(&query(&[("limit", "ten"), ("offset", "x1")]));
        assert_eq!(filter.limit, None);
        assert_eq!(filter.offset, None);
    }

    #[test]
    fn shorthand_fields_become_conditions() {
        let filter = parse_from_query(&query(&[
            ("where", r#"{"and":[{"field":"title","operator":"contains","value":"rust"}]}"#),
            ("status", "published"),
            ("collection_id", "blog"),
        ]));

        let group = filter.where_clause.unwrap();
        assert_eq!(group.and.len(), 3);
        assert_eq!(group.and[1].field, "status");
        assert_eq!(group.and[1].operator, FilterOperator::Equals);
        assert_eq!(group.and[1].value, json!("published"));
        assert_eq!(group.and[2].field, "collection_id");
    }

    #[test]
    fn empty_shorthand_values_are_ignored() {
        let filter = parse_from_query(&query(&[("status", "")]));
        assert!(filter.where_clause.is_none());
    }

    #[test]
    fn malformed_json_is_recorded() {
        let filter = parse_from_query(&query(&[
            ("where", "{not json"),
            ("sort", "[oops"),
            ("status", "draft"),
        ]));

        let group = filter.where_clause.unwrap();
        assert_eq!(group.and.len(), 1);
        assert!(filter.sort.is_empty());
        assert_eq!(filter.rejected.len(), 2);
        assert!(filter.rejected[0].starts_with("Invalid where clause: "));
        assert!(filter.rejected[1].starts_with("Invalid sort clause: "));
    }

    #[test]
    fn bad_condition_does_not_drop_the_where_clause() {
        let filter = parse_from_query(&query(&[(
            "where",
            r#"{"and":[{"field":"status","operator":"equals","value":"published"},{"field":"x","value":1}]}"#,
        )]));

        let group = filter.where_clause.unwrap();
        assert_eq!(group.and.len(), 1);
        assert_eq!(group.and[0].field, "status");
        assert_eq!(group.rejected.len(), 1);
    }

    #[test]
    fn bad_sort_entries_are_skipped_individually() {
        let filter = parse_from_query(&query(&[(
            "sort",
            r#"[{"order":"desc"},{"field":"title","order":"sideways"},{"field":"views","order":"desc"}]"#,
        )]));

        assert_eq!(
            filter.sort,
            vec![
                SortSpec::new("title", SortOrder::Invalid("sideways".to_string())),
                SortSpec::new("views", SortOrder::Desc),
            ]
        );
        assert_eq!(filter.rejected.len(), 1);
        assert!(filter.rejected[0].starts_with("Invalid sort entry 0: "));
    }

    #[test]
    fn sort_is_parsed() {
        let filter = parse_from_query(&query(&[(
            "sort",
            r#"[{"field":"created_at","order":"desc"},{"field":"title"}]"#,
        )]));
        assert_eq!(
            filter.sort,
            vec![
                SortSpec::new("created_at", SortOrder::Desc),
                SortSpec::new("title", SortOrder::Asc),
            ]
        );
    }
}
