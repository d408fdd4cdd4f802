#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Filter compilation from JSON bodies and query strings.

use std::collections::HashMap;

use serde_json::json;
use vellum_kernel::query::{
    MAX_QUERY_LIMIT, QueryFilter, QueryFilterBuilder, build_query, parse_from_query,
};

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn json_body_compiles() {
    let filter: QueryFilter = serde_json::from_str(
        r#"{
            "where": {
                "and": [
                    {"field": "status", "operator": "equals", "value": "active"},
                    {"field": "age", "operator": "greater_than", "value": 18}
                ]
            },
            "sort": [{"field": "created_at", "order": "desc"}],
            "limit": 10,
            "offset": 20
        }"#,
    )
    .unwrap();

    let result = QueryFilterBuilder::new().build("users", &filter);
    assert_eq!(
        result.sql,
        "SELECT * FROM users WHERE (status = ? AND age > ?) ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    assert_eq!(result.params, vec![json!("active"), json!(18), json!(10), json!(20)]);
    assert!(result.errors.is_empty());
}

#[test]
fn query_string_compiles() {
    let filter = parse_from_query(&query(&[
        ("where", r#"{"and":[{"field":"data.author.name","operator":"equals","value":"Ann"}]}"#),
        ("status", "published"),
        ("limit", "25"),
        ("sort", r#"[{"field":"title","order":"ASC"}]"#),
    ]));

    let result = build_query("content", &filter);
    assert_eq!(
        result.sql,
        "SELECT * FROM content WHERE (json_extract(data, '$.author.name') = ? AND status = ?) ORDER BY title ASC LIMIT ?"
    );
    assert_eq!(result.params, vec![json!("Ann"), json!("published"), json!(25)]);
}

#[test]
fn oversized_limit_is_capped() {
    let result = build_query("content", &parse_from_query(&query(&[("limit", "999999")])));
    assert_eq!(result.sql, "SELECT * FROM content LIMIT ?");
    assert_eq!(result.params, vec![json!(MAX_QUERY_LIMIT)]);
}

#[test]
fn errors_accumulate_without_aborting() {
    let filter: QueryFilter = serde_json::from_value(json!({
        "where": {
            "and": [
                {"field": "location", "operator": "within", "value": [1, 2]},
                {"field": "status", "operator": "equals", "value": "published"},
                {"field": "x", "operator": "regex", "value": ".*"}
            ],
            "or": [{"field": "();", "operator": "equals", "value": 1}]
        }
    }))
    .unwrap();

    let result = build_query("content", &filter);
    assert_eq!(result.sql, "SELECT * FROM content WHERE (status = ?)");
    assert_eq!(result.params, vec![json!("published")]);
    assert_eq!(
        result.errors,
        vec![
            "'within' operator not supported in SQLite. Use spatial extension or application-level filtering.".to_string(),
            "Unknown operator: regex".to_string(),
            "Invalid field name: ();".to_string(),
        ]
    );
}

#[test]
fn injection_attempts_stay_inert() {
    let filter: QueryFilter = serde_json::from_value(json!({
        "where": {"and": [
            {"field": "a.b; DROP TABLE x", "operator": "equals", "value": "'; DELETE FROM content; --"}
        ]},
        "sort": [{"field": "title; DROP TABLE content"}]
    }))
    .unwrap();

    let result = build_query("content", &filter);
    assert_eq!(
        result.sql,
        "SELECT * FROM content WHERE (json_extract(a, '$.bDROPTABLEx') = ?) ORDER BY titleDROPTABLEcontent ASC"
    );
    assert_eq!(result.params, vec![json!("'; DELETE FROM content; --")]);
}

#[test]
fn invalid_sort_order_skips_that_entry() {
    let filter: QueryFilter = serde_json::from_value(json!({
        "sort": [
            {"field": "title", "order": "sideways"},
            {"field": "views", "order": "desc"}
        ]
    }))
    .unwrap();
    let result = build_query("content", &filter);
    assert_eq!(result.sql, "SELECT * FROM content ORDER BY views DESC");
    assert_eq!(result.errors, vec!["Invalid sort order: sideways"]);

    let filter = parse_from_query(&query(&[
        ("sort", r#"[{"field":"title","order":"sideways"},{"field":"views","order":"DESC"}]"#),
        ("status", "draft"),
    ]));
    let result = build_query("content", &filter);
    assert_eq!(
        result.sql,
        "SELECT * FROM content WHERE (status = ?) ORDER BY views DESC"
    );
    assert_eq!(result.errors, vec!["Invalid sort order: sideways"]);
    assert!(result.ensure_valid().is_err());
}

#[test]
fn condition_without_operator_keeps_other_predicates() {
    let filter = parse_from_query(&query(&[(
        "where",
        r#"{"and":[{"field":"status","operator":"equals","value":"published"},{"field":"x","value":1}]}"#,
    )]));
    let result = build_query("content", &filter);

    assert_eq!(result.sql, "SELECT * FROM content WHERE (status = ?)");
    assert_eq!(result.params, vec![json!("published")]);
    assert!(!result.errors.is_empty());
    assert!(result.errors[0].contains("operator"));
}

#[test]
fn malformed_where_json_is_an_error() {
    let result = build_query("content", &parse_from_query(&query(&[("where", "{nope")])));
    assert_eq!(result.sql, "SELECT * FROM content");
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Invalid where clause: "));
}

#[test]
fn results_serialize_for_clients() {
    let result = build_query("content", &parse_from_query(&query(&[("status", "draft")])));
    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(
        body,
        json!({
            "sql": "SELECT * FROM content WHERE (status = ?)",
            "params": ["draft"],
            "errors": []
        })
    );
}
