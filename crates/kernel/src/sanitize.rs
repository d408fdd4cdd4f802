//! HTML escaping for user-supplied text.

use serde_json::{Map, Value};

use crate::value::{is_truthy, to_js_string};

/// Escape `& < > " '` in a string.
pub fn escape_html_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape a JSON value. Anything other than a string yields `""`.
pub fn escape_html(value: &Value) -> String {
    match value {
        Value::String(s) => escape_html_str(s),
        _ => String::new(),
    }
}

/// Trim and escape a form input.
///
/// Falsy input yields `""`; other non-string values are stringified first.
pub fn sanitize_input(value: &Value) -> String {
    if !is_truthy(value) {
        return String::new();
    }
    escape_html_str(to_js_string(value).trim())
}

/// Return a copy of `object` with the listed string fields sanitized.
///
/// Fields that are absent or not strings are left untouched.
pub fn sanitize_object(object: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    let mut sanitized = object.clone();
    for field in fields {
        if let Some(value @ Value::String(_)) = object.get(*field) {
            sanitized.insert((*field).to_string(), Value::String(sanitize_input(value)));
        }
    }
    sanitized
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html_str(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn escape_non_string_is_empty() {
        assert_eq!(escape_html(&json!(42)), "");
        assert_eq!(escape_html(&json!(null)), "");
        assert_eq!(escape_html(&json!("<b>")), "&lt;b&gt;");
    }

    #[test]
    fn sanitize_input_trims_and_escapes() {
        assert_eq!(sanitize_input(&json!("  <script>  ")), "&lt;script&gt;");
        assert_eq!(sanitize_input(&json!("")), "");
        assert_eq!(sanitize_input(&json!(null)), "");
        assert_eq!(sanitize_input(&json!(0)), "");
        assert_eq!(sanitize_input(&json!(12)), "12");
    }

    #[test]
    fn sanitize_object_only_touches_named_strings() {
        let object = json!({
            "title": " <h1>Hi</h1> ",
            "body": "<p>keep</p>",
            "count": 3
        });
        let sanitized = sanitize_object(object.as_object().unwrap(), &["title", "count", "missing"]);

        assert_eq!(sanitized["title"], json!("&lt;h1&gt;Hi&lt;/h1&gt;"));
        assert_eq!(sanitized["body"], json!("<p>keep</p>"));
        assert_eq!(sanitized["count"], json!(3));
        assert!(!sanitized.contains_key("missing"));
    }
}
