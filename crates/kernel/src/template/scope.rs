//! Variable resolution for nested `{{#each}}` contexts.

use std::borrow::Cow;

use serde_json::Value;

/// Lookup context for one level of rendering.
///
/// An `Item` scope layers an array element over its parent: loop metadata
/// (`@index`, `@first`, `@last`) wins, then the element's own fields, then
/// `.` (the element itself), then anything visible in the parent.
#[derive(Clone, Copy)]
pub(super) enum Scope<'a> {
    Root(&'a Value),
    Item {
        item: &'a Value,
        index: usize,
        len: usize,
        parent: &'a Scope<'a>,
    },
}

impl<'a> Scope<'a> {
    /// Resolve a dotted path. Objects are walked by key and arrays by
    /// numeric index; `.` alone names the current element.
    pub(super) fn resolve(&self, path: &str) -> Option<Cow<'a, Value>> {
        if path.is_empty() {
            return None;
        }
        if path == "." {
            return self.variable(".");
        }

        let mut segments = path.split('.');
        let mut current = self.variable(segments.next()?)?;
        for key in segments {
            current = match current {
                Cow::Borrowed(value) => Cow::Borrowed(child(value, key)?),
                Cow::Owned(value) => Cow::Owned(child(&value, key)?.clone()),
            };
        }
        Some(current)
    }

    fn variable(&self, name: &str) -> Option<Cow<'a, Value>> {
        match *self {
            Scope::Root(data) => child(data, name).map(Cow::Borrowed),
            Scope::Item {
                item,
                index,
                len,
                parent,
            } => match name {
                "@index" => Some(Cow::Owned(Value::from(index))),
                "@first" => Some(Cow::Owned(Value::Bool(index == 0))),
                "@last" => Some(Cow::Owned(Value::Bool(index + 1 == len))),
                _ => item
                    .as_object()
                    .and_then(|fields| fields.get(name))
                    .map(Cow::Borrowed)
                    .or_else(|| (name == ".").then_some(Cow::Borrowed(item)))
                    .or_else(|| parent.variable(name)),
            },
        }
    }
}

fn child<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
