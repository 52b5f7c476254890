//! Conversion of canonical schema nodes into validation schemas.

use crate::error::SchemaError;
use crate::schema::shorthand::{child_path, expand_node};
use crate::schema::types::{JsonType, TypeKind};
use serde_json::{json, Map, Value};

/// Default value resolved by the persistence layer at write time; never serialized.
pub const WRITE_TIME_DEFAULT: &str = "now()";

/// Keywords known not to constrain a value, so `null` can simply join `type`.
///
/// This list is asserted, not derived. A keyword added to the vocabulary must be
/// added here if it is side-effect free, otherwise nullable nodes carrying it fall
/// back to the `anyOf` rewrite.
pub const NULLABLE_SAFE_KEYWORDS: &[&str] = &[
    "primary", "foreign", "nullable", "unique", "unsigned", "computed", "hidden",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Emit `instanceof` tags for model references instead of `$ref`. Used for
    /// validating returned values, which are model instances rather than input data.
    pub use_instance_of: bool,
}

/// Convert a (possibly shorthand) schema into a validation schema.
pub fn convert_schema(schema: &Value, options: &ConvertOptions) -> Result<Value, SchemaError> {
    convert_at(schema, options, "")
}

fn convert_at(schema: &Value, options: &ConvertOptions, path: &str) -> Result<Value, SchemaError> {
    let node = expand_node(schema, path)?;
    match node.into_owned() {
        Value::Object(map) => convert_map(map, options, path),
        other => Ok(other),
    }
}

fn convert_map(
    mut map: Map<String, Value>,
    options: &ConvertOptions,
    path: &str,
) -> Result<Value, SchemaError> {
    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(entries)) = map.remove(key) {
            let converted = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| convert_at(entry, options, &child_path(path, key, &i.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            map.insert(key.to_string(), Value::Array(converted));
        }
    }
    if let Some(not) = map.remove("not") {
        let converted = convert_at(&not, options, &child_path(path, "not", ""))?;
        map.insert("not".into(), converted);
    }

    let type_name = match map.get("type") {
        Some(Value::String(name)) => Some(name.clone()),
        _ => None,
    };
    if let Some(name) = type_name {
        match TypeKind::resolve(&name) {
            TypeKind::Json(json_type) => {
                map.insert("type".into(), json!(json_type.as_str()));
                match json_type {
                    JsonType::Object => convert_object_keywords(&mut map, options, path)?,
                    JsonType::Array => convert_items(&mut map, options, path)?,
                    _ => {}
                }
            }
            TypeKind::Date => {
                map.insert("type".into(), json!(["string", "object"]));
                add_format(&mut map, "date-time");
            }
            TypeKind::Model(model) => {
                if options.use_instance_of {
                    map.insert("type".into(), json!("object"));
                    map.insert("instanceof".into(), json!(model));
                } else {
                    // Other keywords survive until `nullable` has been handled.
                    map.remove("type");
                    map.insert("$ref".into(), json!(model));
                }
            }
        }
    } else if let Some(Value::Array(names)) = map.get("type") {
        let declares = |t: &str| names.iter().any(|n| n.as_str() == Some(t));
        let (is_object, is_array) = (declares("object"), declares("array"));
        if is_object {
            convert_object_keywords(&mut map, options, path)?;
        }
        if is_array {
            convert_items(&mut map, options, path)?;
        }
    }

    if map.get("type").and_then(Value::as_str) == Some("object") {
        // Lifted into the parent's `required` list by `expand_properties`.
        if let Some(Value::Bool(_)) = map.get("required") {
            map.remove("required");
        }
    } else {
        if let Some(Value::Bool(required)) = map.get("required").cloned() {
            map.remove("required");
            if required {
                // Property-level `required` means "present and not empty", which only
                // a format can express outside of an object's `required` list.
                add_format(&mut map, "required");
            }
        }
        if let Some(default) = map.remove("default") {
            if default.as_str() != Some(WRITE_TIME_DEFAULT) {
                map.insert("default".into(), default);
            }
        }
    }

    if map.get("nullable") == Some(&Value::Bool(true)) {
        Ok(make_nullable(map))
    } else if let Some(reference) = map.remove("$ref") {
        Ok(json!({ "$ref": reference }))
    } else {
        Ok(Value::Object(map))
    }
}

fn convert_object_keywords(
    map: &mut Map<String, Value>,
    options: &ConvertOptions,
    path: &str,
) -> Result<(), SchemaError> {
    let mut declared = false;
    if let Some(Value::Object(properties)) = map.remove("properties") {
        let (properties, required) =
            expand_properties(&properties, options, &child_path(path, "properties", ""))?;
        map.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            let mut list = match map.remove("required") {
                Some(Value::Array(existing)) => existing,
                _ => Vec::new(),
            };
            for name in required {
                let name = Value::String(name);
                if !list.contains(&name) {
                    list.push(name);
                }
            }
            map.insert("required".into(), Value::Array(list));
        }
        declared = true;
    }
    if let Some(Value::Object(patterns)) = map.remove("patternProperties") {
        let (patterns, _) =
            expand_properties(&patterns, options, &child_path(path, "patternProperties", ""))?;
        map.insert("patternProperties".into(), Value::Object(patterns));
        declared = true;
    }
    if declared && !map.contains_key("additionalProperties") {
        map.insert("additionalProperties".into(), Value::Bool(false));
    }
    Ok(())
}

fn convert_items(
    map: &mut Map<String, Value>,
    options: &ConvertOptions,
    path: &str,
) -> Result<(), SchemaError> {
    let items_path = child_path(path, "items", "");
    let converted = match map.remove("items") {
        Some(Value::Array(list)) => Some(Value::Array(
            list.iter()
                .map(|item| convert_at(item, options, &items_path))
                .collect::<Result<_, _>>()?,
        )),
        Some(single) => Some(convert_at(&single, options, &items_path)?),
        None => None,
    };
    if let Some(items) = converted {
        map.insert("items".into(), items);
    }
    Ok(())
}

/// Convert each property and collect the names marked `required: true`, in
/// declaration order.
pub fn expand_properties(
    properties: &Map<String, Value>,
    options: &ConvertOptions,
    path: &str,
) -> Result<(Map<String, Value>, Vec<String>), SchemaError> {
    let mut converted = Map::with_capacity(properties.len());
    let mut required = Vec::new();
    for (name, property) in properties {
        let property_path = format!("{}/{}", path, name);
        let property = expand_node(property, &property_path)?;
        if property.get("required") == Some(&Value::Bool(true)) {
            required.push(name.clone());
        }
        converted.insert(name.clone(), convert_at(&property, options, &property_path)?);
    }
    Ok((converted, required))
}

/// Add a `format`, combining it with an existing one through `allOf`.
pub fn add_format(map: &mut Map<String, Value>, format: &str) {
    let existing = map.remove("format");
    if existing.as_ref().and_then(Value::as_str) == Some(format) {
        map.insert("format".into(), json!(format));
        return;
    }
    if existing.is_none() && !map.contains_key("allOf") {
        map.insert("format".into(), json!(format));
        return;
    }
    let mut all_of = match map.remove("allOf") {
        Some(Value::Array(entries)) => entries,
        Some(other) => vec![other],
        None => Vec::new(),
    };
    if let Some(existing) = existing {
        all_of.push(json!({ "format": existing }));
    }
    if !all_of.iter().any(|e| e.get("format").and_then(Value::as_str) == Some(format)) {
        all_of.push(json!({ "format": format }));
    }
    map.insert("allOf".into(), Value::Array(all_of));
}

/// Allow `null` in addition to what the node accepts.
///
/// Mixing `null` into `type` would let null values bypass other keywords (a
/// `format` check, for instance), so nodes carrying such keywords and references
/// get a separate `anyOf` branch. `nullable` and `validate` stay at the root.
pub fn make_nullable(mut map: Map<String, Value>) -> Value {
    if let Some(Value::Array(types)) = map.get("type") {
        if types.iter().any(|t| t.as_str() == Some("null")) {
            return Value::Object(map);
        }
    }
    let nullable = map.remove("nullable");
    let validate = map.remove("validate");
    let reference = map.remove("$ref");
    let ty = map.remove("type");
    let needs_separate_schema = reference.is_some()
        || map
            .keys()
            .any(|key| !NULLABLE_SAFE_KEYWORDS.contains(&key.as_str()));

    let mut out = Map::new();
    if needs_separate_schema {
        let not_null = match reference {
            Some(reference) => json!({ "$ref": reference }),
            None => {
                let mut rest = Map::with_capacity(map.len() + 1);
                if let Some(ty) = ty {
                    rest.insert("type".into(), ty);
                }
                rest.extend(map);
                Value::Object(rest)
            }
        };
        out.insert("anyOf".into(), json!([{ "type": "null" }, not_null]));
        out.insert("nullable".into(), nullable.unwrap_or(Value::Bool(true)));
        if let Some(validate) = validate {
            out.insert("validate".into(), validate);
        }
    } else {
        // `null` first, for coercing validation.
        let mut types = vec![json!("null")];
        match ty {
            Some(Value::Array(list)) => types.extend(list),
            Some(single) => types.push(single),
            None => {}
        }
        out.insert("type".into(), Value::Array(types));
        out.insert("nullable".into(), nullable.unwrap_or(Value::Bool(true)));
        if let Some(validate) = validate {
            out.insert("validate".into(), validate);
        }
        out.extend(map);
    }
    Value::Object(out)
}
