//! Expansion of the author-facing shorthand notation into canonical schema nodes.
//!
//! - `"string"` becomes `{ "type": "string" }`
//! - `["Tag"]` becomes `{ "type": "array", "items": { "type": "Tag" }, "default": [] }`
//! - `["A", "B"]` becomes an array whose `items` is `{ "anyOf": [A, B] }`
//! - a mapping without a discriminating keyword becomes a closed object whose
//!   properties are the mapping's entries

use crate::error::SchemaError;
use serde_json::{json, Map, Value};
use std::borrow::Cow;

/// Keywords whose schema-valued entries are expanded recursively.
const COMPOSITE_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Shape of a schema position, decided once before any rewriting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shorthand<'a> {
    /// A bare type name.
    TypeName(&'a str),
    /// An array literal listing item types.
    List(&'a [Value]),
    /// A mapping listing object properties without `type: object`.
    BareObject(&'a Map<String, Value>),
    /// A mapping that already declares `type`, `$ref`, a composite or `not`.
    Explicit(&'a Map<String, Value>),
    /// Anything else: boolean schemas pass, other scalars are malformed.
    Other(&'a Value),
}

impl<'a> Shorthand<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(name) => Shorthand::TypeName(name),
            Value::Array(items) => Shorthand::List(items),
            Value::Object(map) if is_explicit(map) => Shorthand::Explicit(map),
            Value::Object(map) => Shorthand::BareObject(map),
            other => Shorthand::Other(other),
        }
    }
}

fn is_explicit(map: &Map<String, Value>) -> bool {
    let declares_type = match map.get("type") {
        Some(Value::String(_)) => true,
        Some(Value::Array(names)) => !names.is_empty() && names.iter().all(Value::is_string),
        _ => false,
    };
    declares_type
        || matches!(map.get("$ref"), Some(Value::String(_)))
        || COMPOSITE_KEYWORDS
            .iter()
            .any(|k| matches!(map.get(*k), Some(Value::Array(_))))
        || matches!(map.get("not"), Some(Value::Object(_)))
}

/// Fully expand a shorthand tree. `expand(&expand(x)?)? == expand(x)?`.
pub fn expand(value: &Value) -> Result<Value, SchemaError> {
    expand_at(value, "")
}

fn expand_at(value: &Value, path: &str) -> Result<Value, SchemaError> {
    let node = expand_node(value, path)?;
    match node.as_ref() {
        Value::Object(map) => Ok(Value::Object(expand_children(map, path)?)),
        other => Ok(other.clone()),
    }
}

/// Rewrite only the node at `path` into its canonical shape; children stay as written.
pub(crate) fn expand_node<'a>(value: &'a Value, path: &str) -> Result<Cow<'a, Value>, SchemaError> {
    Ok(match Shorthand::classify(value) {
        Shorthand::TypeName(name) => Cow::Owned(json!({ "type": name })),
        Shorthand::List(items) => {
            let items = match items {
                [] => {
                    return Err(SchemaError::malformed(
                        path,
                        "array shorthand needs at least one item type",
                    ))
                }
                [single] => single.clone(),
                many => json!({ "anyOf": many }),
            };
            Cow::Owned(json!({
                "type": "array",
                "items": items,
                "default": []
            }))
        }
        Shorthand::BareObject(map) => Cow::Owned(json!({
            "type": "object",
            "properties": map,
            "additionalProperties": false
        })),
        Shorthand::Explicit(_) | Shorthand::Other(Value::Bool(_)) => Cow::Borrowed(value),
        Shorthand::Other(other) => {
            return Err(SchemaError::malformed(
                path,
                format!("expected a schema, got {}", other),
            ))
        }
    })
}

fn expand_children(map: &Map<String, Value>, path: &str) -> Result<Map<String, Value>, SchemaError> {
    let mut out = map.clone();
    for key in ["properties", "patternProperties"] {
        if let Some(Value::Object(props)) = map.get(key) {
            let mut expanded = Map::with_capacity(props.len());
            for (name, prop) in props {
                expanded.insert(name.clone(), expand_at(prop, &child_path(path, key, name))?);
            }
            out.insert(key.to_string(), Value::Object(expanded));
        }
    }
    if let Some(items) = map.get("items") {
        let items_path = child_path(path, "items", "");
        let expanded = match items {
            // Tuple form: each entry is a schema of its own.
            Value::Array(list) => Value::Array(
                list.iter()
                    .map(|item| expand_at(item, &items_path))
                    .collect::<Result<_, _>>()?,
            ),
            single => expand_at(single, &items_path)?,
        };
        out.insert("items".into(), expanded);
    }
    for key in COMPOSITE_KEYWORDS {
        if let Some(Value::Array(list)) = map.get(*key) {
            let entries = list
                .iter()
                .enumerate()
                .map(|(i, entry)| expand_at(entry, &child_path(path, key, &i.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            out.insert((*key).to_string(), Value::Array(entries));
        }
    }
    if let Some(not @ Value::Object(_)) = map.get("not") {
        out.insert("not".into(), expand_at(not, &child_path(path, "not", ""))?);
    }
    Ok(out)
}

pub(crate) fn child_path(path: &str, keyword: &str, name: &str) -> String {
    let mut out = String::from(path);
    out.push('/');
    out.push_str(keyword);
    if !name.is_empty() {
        out.push('/');
        out.push_str(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn expands_type_names() {
        assert_eq!(expand(&json!("string")).unwrap(), json!({ "type": "string" }));
    }

    #[test]
    fn expands_array_literals() {
        assert_eq!(
            expand(&json!(["Tag"])).unwrap(),
            json!({ "type": "array", "items": { "type": "Tag" }, "default": [] })
        );
        assert_eq!(
            expand(&json!(["string", "integer"])).unwrap(),
            json!({
                "type": "array",
                "items": { "anyOf": [{ "type": "string" }, { "type": "integer" }] },
                "default": []
            })
        );
    }

    #[test]
    fn expands_bare_objects_recursively() {
        let expanded = expand(&json!({
            "street": "string",
            "geo": { "lat": "number", "lng": "number" }
        }))
        .unwrap();
        assert_eq!(
            expanded,
            json!({
                "type": "object",
                "properties": {
                    "street": { "type": "string" },
                    "geo": {
                        "type": "object",
                        "properties": {
                            "lat": { "type": "number" },
                            "lng": { "type": "number" }
                        },
                        "additionalProperties": false
                    }
                },
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn explicit_nodes_pass_through_with_expanded_children() {
        let expanded = expand(&json!({
            "anyOf": ["string", { "$ref": "User" }],
            "nullable": true
        }))
        .unwrap();
        assert_eq!(
            expanded,
            json!({
                "anyOf": [{ "type": "string" }, { "$ref": "User" }],
                "nullable": true
            })
        );
    }

    #[test]
    fn property_named_type_is_not_a_discriminator() {
        let expanded = expand(&json!({ "type": { "type": "string" } })).unwrap();
        assert_eq!(expanded["type"], json!("object"));
        assert_eq!(expanded["properties"]["type"], json!({ "type": "string" }));
    }

    #[test]
    fn rejects_empty_array_and_scalars() {
        assert!(expand(&json!([])).is_err());
        let err = expand(&json!({ "count": 5 })).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Malformed {
                path: "/properties/count".into(),
                message: "expected a schema, got 5".into()
            }
        );
    }

    fn shorthand_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(json!("string")),
            Just(json!("integer")),
            Just(json!("timestamp")),
            Just(json!("User")),
            Just(json!({ "type": "number", "nullable": true })),
            Just(json!({ "$ref": "Post" })),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..3).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner.clone(), 1..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
                prop::collection::vec(inner, 1..3).prop_map(|v| json!({ "oneOf": v })),
            ]
        })
    }

    proptest! {
        #[test]
        fn expansion_is_idempotent(input in shorthand_strategy()) {
            let once = expand(&input).unwrap();
            let twice = expand(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
