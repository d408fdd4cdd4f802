//! Template renderer.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::scope::Scope;
use crate::value::{is_truthy, to_js_string};

/// Upper bound on `{{#if}}` resolution passes per render.
pub const MAX_IF_PASSES: usize = 100;

#[allow(clippy::expect_used)]
static EACH_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{#each\s+([^}]+)\}\}").expect("valid regex literal"));

#[allow(clippy::expect_used)]
static EACH_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{#each\s+[^}]+\}\}|\{\{/each\}\}").expect("valid regex literal")
});

#[allow(clippy::expect_used)]
static IF_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{#if\s+([^}]+)\}\}").expect("valid regex literal"));

#[allow(clippy::expect_used)]
static IF_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{#if\s+[^}]+\}\}|\{\{/if\}\}").expect("valid regex literal")
});

/// `{{{path}}}`
#[allow(clippy::expect_used)]
static RAW_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\{([^}]+)\}\}\}").expect("valid regex literal"));

/// `{{helper arg}}`
#[allow(clippy::expect_used)]
static HELPER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}#/]+)\s+([^}]+)\}\}").expect("valid regex literal"));

/// `{{path}}`
#[allow(clippy::expect_used)]
static PLAIN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}#/]+)\}\}").expect("valid regex literal"));

/// Renders Handlebars-style templates against JSON data.
///
/// Passes run in a fixed order, each over the output of the previous one:
/// 1. `{{#each path}}...{{/each}}`
/// 2. `{{#if path}}...{{/if}}` (repeated until stable)
/// 3. `{{{path}}}`
/// 4. `{{titleCase path}}`
/// 5. `{{path}}`
///
/// Values are inserted verbatim; callers escape untrusted data with
/// [`crate::sanitize`] before rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `template` against `data`.
    pub fn render(&self, template: &str, data: &Value) -> String {
        self.render_scope(template, &Scope::Root(data))
    }

    fn render_scope(&self, template: &str, scope: &Scope<'_>) -> String {
        let rendered = replace_blocks(template, &EACH_OPEN, &EACH_TOKENS, |path, body| {
            self.render_each(path, body, scope)
        });

        let rendered = self.resolve_conditionals(rendered, scope);

        let rendered = RAW_TAG.replace_all(&rendered, |caps: &Captures<'_>| {
            display(scope.resolve(caps[1].trim()).as_deref())
        });

        let rendered = HELPER_TAG.replace_all(&rendered, |caps: &Captures<'_>| {
            apply_helper(caps[1].trim(), caps[2].trim(), scope)
                .unwrap_or_else(|| caps[0].to_string())
        });

        PLAIN_TAG
            .replace_all(&rendered, |caps: &Captures<'_>| {
                let path = caps[1].trim();
                if path.contains(' ') {
                    return caps[0].to_string();
                }
                display(scope.resolve(path).as_deref())
            })
            .into_owned()
    }

    fn render_each(&self, path: &str, body: &str, scope: &Scope<'_>) -> String {
        let Some(list) = scope.resolve(path) else {
            return String::new();
        };
        let Value::Array(items) = list.as_ref() else {
            return String::new();
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let child = Scope::Item {
                    item,
                    index,
                    len: items.len(),
                    parent: scope,
                };
                self.render_scope(body, &child)
            })
            .collect()
    }

    fn resolve_conditionals(&self, mut rendered: String, scope: &Scope<'_>) -> String {
        let mut passes = 0;
        while passes < MAX_IF_PASSES && rendered.contains("{{#if ") {
            let next = replace_blocks(&rendered, &IF_OPEN, &IF_TOKENS, |condition, body| {
                if scope.resolve(condition).is_some_and(|value| is_truthy(&value)) {
                    self.render_scope(body, scope)
                } else {
                    String::new()
                }
            });
            if next == rendered {
                break;
            }
            rendered = next;
            passes += 1;
        }
        rendered
    }
}

/// Render `template` against `data` with a default renderer.
pub fn render_template(template: &str, data: &Value) -> String {
    TemplateRenderer::new().render(template, data)
}

/// Replace every balanced `open ... close` block in `input`.
///
/// `tokens` matches both the opening and closing tags so nested blocks of
/// the same kind pair up correctly. An opener without a matching closer is
/// left in place as literal text.
fn replace_blocks(
    input: &str,
    open: &Regex,
    tokens: &Regex,
    mut render: impl FnMut(&str, &str) -> String,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = open.captures_at(input, search) {
        let (Some(tag), Some(arg)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        match closing_tag(input, tag.end(), tokens) {
            Some((body_end, block_end)) => {
                out.push_str(&input[copied..tag.start()]);
                out.push_str(&render(arg.as_str().trim(), &input[tag.end()..body_end]));
                copied = block_end;
                search = block_end;
            }
            None => search = tag.end(),
        }
    }

    out.push_str(&input[copied..]);
    out
}

/// Find the closer pairing with an opener that ends at `from`.
///
/// Returns the byte offsets where the closing tag starts and ends.
fn closing_tag(input: &str, from: usize, tokens: &Regex) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    for token in tokens.find_iter(&input[from..]) {
        if token.as_str().starts_with("{{/") {
            depth -= 1;
            if depth == 0 {
                return Some((from + token.start(), from + token.end()));
            }
        } else {
            depth += 1;
        }
    }
    None
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => to_js_string(value),
    }
}

fn apply_helper(helper: &str, arg: &str, scope: &Scope<'_>) -> Option<String> {
    match helper {
        "titleCase" => {
            let value = scope.resolve(arg)?;
            if value.is_null() {
                return None;
            }
            Some(title_case(&to_js_string(&value)))
        }
        _ => None,
    }
}

/// `hello_world` -> `Hello World`.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_ascii_alphanumeric();
        if is_word && !in_word {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        in_word = is_word;
    }
    out
}
