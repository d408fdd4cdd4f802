//! JSON value helpers shared by the query compiler and the template renderer.
//!
//! Filter values and template data arrive as untyped JSON from HTTP callers,
//! which expect loose scripting-language semantics for truthiness and
//! stringification. These helpers pin those semantics down in one place.

use serde_json::{Number, Value};

/// Loose truthiness: `false`, `0`, `""` and `null` are falsy; everything
/// else (including empty arrays and objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Stringify a value the way a scripting runtime would.
///
/// Strings are returned verbatim, integral floats drop their fraction
/// (`3.0` becomes `"3"`), arrays are joined with commas with `null`
/// elements rendered empty, and objects become `[object Object]`.
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                if item.is_null() {
                    String::new()
                } else {
                    to_js_string(item)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_to_string(n: &Number) -> String {
    if n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract() == 0.0
        && f.abs() < 1e21
    {
        if f == 0.0 {
            return "0".to_string();
        }
        return format!("{f:.0}");
    }
    n.to_string()
}

/// Normalize a list-valued filter operand.
///
/// Strings are split on commas with each piece trimmed and empty pieces
/// dropped; arrays pass through; any other value becomes a one-element list.
pub fn to_list(value: &Value) -> Vec<Value> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| Value::String(piece.to_string()))
            .collect(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
