//! `Model1[propA,propB],Model2[propC]` expressions for `pick` and `omit`.

use crate::error::QueryError;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub type PropertiesExpression = IndexMap<String, Vec<String>>;

fn words() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"\b(\w+)\b").expect("word pattern"))
}

fn parse_one(expression: &str) -> Result<PropertiesExpression, QueryError> {
    let invalid = |message: String| QueryError::InvalidPropertiesExpression {
        value: expression.to_string(),
        message,
    };
    let quoted = words().replace_all(expression, "\"${1}\"").replace("\"[", "\":[");
    serde_json::from_str(&format!("{{{}}}", quoted)).map_err(|e| invalid(e.to_string()))
}

/// Parse a properties expression; list values are parsed per entry and merged,
/// later entries overwriting earlier models.
pub fn parse_properties_expression(value: &Value) -> Result<PropertiesExpression, QueryError> {
    match value {
        Value::String(expression) => parse_one(expression),
        Value::Array(entries) => {
            let mut merged = PropertiesExpression::new();
            for entry in entries {
                merged.extend(parse_properties_expression(entry)?);
            }
            Ok(merged)
        }
        Value::Null => Ok(PropertiesExpression::new()),
        other => Err(QueryError::InvalidPropertiesExpression {
            value: other.to_string(),
            message: "expected a string or a list of strings".into(),
        }),
    }
}
