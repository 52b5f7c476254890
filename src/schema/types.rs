//! Closed classification of schema type names.

/// Validation primitives a declared type name can map to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    /// Look up a declared type name. `text` is an alias of `string`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" | "text" => JsonType::String,
            "number" => JsonType::Number,
            "integer" => JsonType::Integer,
            "boolean" => JsonType::Boolean,
            "object" => JsonType::Object,
            "array" => JsonType::Array,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }
}

/// Type names accepted for date values, both serialized and native.
pub const DATE_TYPES: &[&str] = &["date", "datetime", "timestamp"];

/// What a `type` string declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind<'a> {
    Json(JsonType),
    Date,
    /// Any name that is neither a primitive nor a date kind refers to another model.
    /// The reference stays unresolved until the validator's schema registry sees it.
    Model(&'a str),
}

impl<'a> TypeKind<'a> {
    /// Resolution order: primitive table, date kinds, model reference.
    pub fn resolve(name: &'a str) -> Self {
        if let Some(json) = JsonType::from_name(name) {
            TypeKind::Json(json)
        } else if DATE_TYPES.contains(&name) {
            TypeKind::Date
        } else {
            TypeKind::Model(name)
        }
    }
}
