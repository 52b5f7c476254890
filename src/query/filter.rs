//! `where` / `orWhere` parameters flattened into property filters.
//!
//! Object notation is flattened into dotted property references:
//!
//! ```text
//! { firstName: { like: 'Jo%' }, messages: { unread: true } }
//!   -> firstName like 'Jo%'
//!   -> messages.unread = true
//! ```
//!
//! Object keys may end in an operator, `{ 'firstName like': 'Jo%' }`.
//! String notation is `ref=value`, `ref<op>value` or `ref <op>=value`.

use crate::config::ModelRegistry;
use crate::error::QueryError;
use crate::query::builder::{QueryPlanStep, WhereKind};
use crate::query::path::resolve_path;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "notBetween")]
    NotBetween,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "notNull")]
    NotNull,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "notEmpty")]
    NotEmpty,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 16] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Lt,
        FilterOperator::Le,
        FilterOperator::Gt,
        FilterOperator::Ge,
        FilterOperator::Like,
        FilterOperator::ILike,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Between,
        FilterOperator::NotBetween,
        FilterOperator::Null,
        FilterOperator::NotNull,
        FilterOperator::Empty,
        FilterOperator::NotEmpty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Lt => "<",
            FilterOperator::Le => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Ge => ">=",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "ilike",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::Between => "between",
            FilterOperator::NotBetween => "notBetween",
            FilterOperator::Null => "null",
            FilterOperator::NotNull => "notNull",
            FilterOperator::Empty => "empty",
            FilterOperator::NotEmpty => "notEmpty",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Operators that take no value.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            FilterOperator::Null | FilterOperator::NotNull | FilterOperator::Empty | FilterOperator::NotEmpty
        )
    }

    fn takes_list(self) -> bool {
        matches!(
            self,
            FilterOperator::In | FilterOperator::NotIn | FilterOperator::Between | FilterOperator::NotBetween
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryFilter {
    /// Dotted property path, leading segments being relation names.
    pub reference: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl QueryFilter {
    pub fn new(reference: impl Into<String>, operator: FilterOperator, value: Value) -> Result<Self, QueryError> {
        let reference = reference.into();
        if reference.is_empty() || reference.split('.').any(str::is_empty) {
            return Err(QueryError::UnsupportedWhere(format!("{} {}", reference, operator)));
        }
        let value = match value {
            // `in=a,b` and `between=1,10` arrive as text
            Value::String(s) if operator.takes_list() => {
                Value::Array(s.split(',').map(|v| Value::String(v.trim().to_string())).collect())
            }
            other => other,
        };
        if matches!(operator, FilterOperator::Between | FilterOperator::NotBetween)
            && value.as_array().map_or(true, |v| v.len() != 2)
        {
            return Err(QueryError::InvalidValue {
                key: format!("{} {}", reference, operator),
                value: value.to_string(),
            });
        }
        Ok(QueryFilter {
            reference,
            operator,
            value,
        })
    }

    /// Parse the string notation. The first `=` separates the value; `!`, `<` and `>`
    /// before it belong to the operator.
    pub fn parse(entry: &str) -> Result<Self, QueryError> {
        let unsupported = || QueryError::UnsupportedWhere(entry.to_string());
        let (left, symbol, value) = match entry.find(&['=', '<', '>'][..]) {
            Some(i) => {
                let (head, tail) = entry.split_at(i);
                let (symbol, value) = match (tail.as_bytes()[0], tail.as_bytes().get(1).copied()) {
                    (b'<', Some(b'=')) => (FilterOperator::Le, &tail[2..]),
                    (b'>', Some(b'=')) => (FilterOperator::Ge, &tail[2..]),
                    (b'<', _) => (FilterOperator::Lt, &tail[1..]),
                    (b'>', _) => (FilterOperator::Gt, &tail[1..]),
                    _ => (FilterOperator::Eq, &tail[1..]),
                };
                match head.strip_suffix('!') {
                    Some(head) if symbol == FilterOperator::Eq => (head, Some(FilterOperator::Ne), Some(value)),
                    _ => (head, Some(symbol), Some(value)),
                }
            }
            None => (entry, None, None),
        };

        let mut tokens = left.split_whitespace();
        let reference = tokens.next().ok_or_else(unsupported)?;
        let named = match tokens.next() {
            Some(name) => Some(FilterOperator::from_name(name).ok_or_else(unsupported)?),
            None => None,
        };
        if tokens.next().is_some() {
            return Err(unsupported());
        }

        let operator = match (named, symbol) {
            // `ref like=value`: the `=` only separates the value
            (Some(named), None | Some(FilterOperator::Eq)) => named,
            (Some(_), Some(_)) => return Err(unsupported()),
            (None, Some(symbol)) => symbol,
            (None, None) => return Err(unsupported()),
        };
        let value = match value {
            Some(value) => Value::String(value.to_string()),
            None if operator.is_unary() => Value::Null,
            None => return Err(unsupported()),
        };
        QueryFilter::new(reference, operator, value)
    }
}

/// Flatten a `where` value into filters, in received order.
pub fn flatten_where(value: &Value) -> Result<Vec<QueryFilter>, QueryError> {
    let mut filters = Vec::new();
    flatten_entry(value, &mut filters)?;
    Ok(filters)
}

fn flatten_entry(value: &Value, out: &mut Vec<QueryFilter>) -> Result<(), QueryError> {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_property(key, value, &[], out)?;
            }
        }
        Value::String(entry) => out.push(QueryFilter::parse(entry)?),
        Value::Array(entries) => {
            for entry in entries {
                flatten_entry(entry, out)?;
            }
        }
        other => return Err(QueryError::UnsupportedWhere(other.to_string())),
    }
    Ok(())
}

/// Split an object key into its property segment and an optional trailing operator,
/// `"firstName like"` being the key form of `firstName like=...`.
fn split_key(key: &str) -> Result<(&str, Option<FilterOperator>), QueryError> {
    let unsupported = || QueryError::UnsupportedWhere(key.to_string());
    let mut tokens = key.split_whitespace();
    let segment = tokens.next().ok_or_else(unsupported)?;
    let operator = match tokens.next() {
        Some(name) => Some(FilterOperator::from_name(name).ok_or_else(unsupported)?),
        None => None,
    };
    if tokens.next().is_some() {
        return Err(unsupported());
    }
    Ok((segment, operator))
}

fn flatten_property(
    key: &str,
    value: &Value,
    parents: &[&str],
    out: &mut Vec<QueryFilter>,
) -> Result<(), QueryError> {
    let (segment, keyed_operator) = split_key(key)?;
    let mut path = parents.to_vec();
    if let Value::Object(map) = value {
        if keyed_operator.is_some() {
            return Err(QueryError::UnsupportedWhere(key.to_string()));
        }
        path.push(segment);
        for (key, value) in map {
            flatten_property(key, value, &path, out)?;
        }
        return Ok(());
    }
    let operator = match keyed_operator {
        Some(operator) => {
            path.push(segment);
            operator
        }
        // Only nested keys can name an operator on their own.
        None => match FilterOperator::from_name(segment).filter(|_| !parents.is_empty()) {
            Some(operator) => operator,
            None => {
                path.push(segment);
                FilterOperator::Eq
            }
        },
    };
    out.push(QueryFilter::new(path.join("."), operator, value.clone())?);
    Ok(())
}

/// Flatten a `where` value and check every reference against `model`.
pub fn translate_where<R: ModelRegistry + ?Sized>(
    kind: WhereKind,
    value: &Value,
    model: &str,
    registry: &R,
) -> Result<Vec<QueryPlanStep>, QueryError> {
    flatten_where(value)?
        .into_iter()
        .map(|filter| {
            resolve_path(model, &filter.reference, registry)?;
            Ok(QueryPlanStep::Where { kind, filter })
        })
        .collect()
}
