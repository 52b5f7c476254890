//! REST query parameters translated into a [`QueryPlan`].

use crate::config::ModelRegistry;
use crate::error::QueryError;
use crate::query::builder::{Direction, QueryPlan, QueryPlanStep, WhereKind};
use crate::query::filter::translate_where;
use crate::query::path::resolve_path;
use crate::query::properties::parse_properties_expression;
use crate::query::scope::find_scope;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Every parameter with a handler, in handling order of the docs.
pub const QUERY_PARAMETERS: &[&str] = &[
    "where", "orWhere", "eager", "scope", "eagerScope", "range", "limit", "offset", "order",
    "omit", "pick",
];

/// Parameters a route accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedKeys {
    keys: BTreeSet<&'static str>,
}

impl AllowedKeys {
    pub fn all() -> Self {
        Self::excluding(&[])
    }

    pub fn excluding(excluded: &[&str]) -> Self {
        AllowedKeys {
            keys: QUERY_PARAMETERS
                .iter()
                .copied()
                .filter(|key| !excluded.contains(key))
                .collect(),
        }
    }

    /// Single-row lookups have nothing to order or page.
    pub fn find_one() -> Self {
        Self::excluding(&["order", "range"])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Default for AllowedKeys {
    fn default() -> Self {
        Self::all()
    }
}

/// Translate `params` for a query on `model`. Fails on the first invalid or disallowed
/// parameter; steps follow the order the parameters were received in.
pub fn translate_query<R: ModelRegistry + ?Sized>(
    params: &Map<String, Value>,
    allowed: &AllowedKeys,
    model: &str,
    registry: &R,
) -> Result<QueryPlan, QueryError> {
    if !registry.contains_model(model) {
        return Err(QueryError::UnknownModel(model.to_string()));
    }
    let mut steps = Vec::new();
    for (key, value) in params {
        if !allowed.contains(key) {
            return Err(QueryError::UnsupportedParameter(key.clone()));
        }
        match key.as_str() {
            "where" => steps.extend(translate_where(WhereKind::And, value, model, registry)?),
            "orWhere" => steps.extend(translate_where(WhereKind::Or, value, model, registry)?),
            "eager" => {
                for expression in strings(key, value)? {
                    steps.push(QueryPlanStep::MergeEager { expression });
                }
            }
            "scope" => {
                let names = strings(key, value)?;
                for name in &names {
                    find_scope(model, name, registry)?;
                }
                push_names(&mut steps, names, |names| QueryPlanStep::MergeScope { names });
            }
            "eagerScope" => push_names(&mut steps, strings(key, value)?, |names| {
                QueryPlanStep::MergeEagerScope { names }
            }),
            "range" => {
                if let Some((start, end)) = parse_range(value)? {
                    steps.push(QueryPlanStep::Range { start, end });
                }
            }
            "limit" => {
                if let Some(limit) = parse_count(key, value)? {
                    steps.push(QueryPlanStep::Limit { limit });
                }
            }
            "offset" => {
                if let Some(offset) = parse_count(key, value)? {
                    steps.push(QueryPlanStep::Offset { offset });
                }
            }
            "order" => translate_order(&mut steps, value, model, registry)?,
            "pick" | "omit" => translate_properties(&mut steps, key, value, registry)?,
            _ => return Err(QueryError::UnsupportedParameter(key.clone())),
        }
    }
    tracing::debug!(model = %model, steps = steps.len(), "translated query");
    Ok(QueryPlan { steps })
}

fn invalid(key: &str, value: &Value) -> QueryError {
    QueryError::InvalidValue {
        key: key.to_string(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// A string or a list of strings; empty strings are dropped.
fn strings(key: &str, value: &Value) -> Result<Vec<String>, QueryError> {
    let entries: Vec<&Value> = match value {
        Value::Array(list) => list.iter().collect(),
        Value::Null => Vec::new(),
        single => vec![single],
    };
    entries
        .into_iter()
        .filter(|entry| entry.as_str() != Some(""))
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(key, value))
        })
        .collect()
}

fn push_names(steps: &mut Vec<QueryPlanStep>, names: Vec<String>, step: impl FnOnce(Vec<String>) -> QueryPlanStep) {
    if !names.is_empty() {
        steps.push(step(names));
    }
}

/// Any finite number; fractions are compared as given and truncated afterwards.
fn range_bound(value: &Value) -> Option<f64> {
    let bound: f64 = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    bound.is_finite().then_some(bound)
}

fn bound_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn range_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s*,\s*").expect("range separator pattern"))
}

/// `"start,end"` or `[start, end]`. Empty values are skipped.
fn parse_range(value: &Value) -> Result<Option<(i64, i64)>, QueryError> {
    let bounds: Vec<Value> = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => {
            range_separator()
                .split(s.trim())
                .map(|part| Value::String(part.to_string()))
                .collect()
        }
        Value::Array(list) if list.is_empty() => return Ok(None),
        Value::Array(list) => list.clone(),
        other => return Err(invalid("range", other)),
    };
    let [start, end] = bounds.as_slice() else {
        return Err(invalid("range", value));
    };
    match (range_bound(start), range_bound(end)) {
        (Some(s), Some(e)) if e >= s => Ok(Some((s.trunc() as i64, e.trunc() as i64))),
        _ => Err(QueryError::InvalidRange {
            start: bound_text(start),
            end: bound_text(end),
        }),
    }
}

/// Non-negative integer, as a number or numeric string. Empty values are skipped.
fn parse_count(key: &str, value: &Value) -> Result<Option<u64>, QueryError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.trim().parse().map(Some).map_err(|_| invalid(key, value)),
        Value::Number(n) => n.as_u64().map(Some).ok_or_else(|| invalid(key, value)),
        other => Err(invalid(key, other)),
    }
}

fn translate_order<R: ModelRegistry + ?Sized>(
    steps: &mut Vec<QueryPlanStep>,
    value: &Value,
    model: &str,
    registry: &R,
) -> Result<(), QueryError> {
    for entry in strings("order", value)? {
        let mut tokens = entry.split_whitespace();
        let reference = tokens.next().ok_or_else(|| invalid("order", value))?;
        let direction = match tokens.next() {
            Some(token) => Direction::parse(token).ok_or_else(|| invalid("order", value))?,
            None => Direction::default(),
        };
        if tokens.next().is_some() {
            return Err(invalid("order", value));
        }
        let path = resolve_path(model, reference, registry)?;
        if !path.is_one_to_one() {
            return Err(QueryError::OrderThroughRelation(entry.clone()));
        }
        let column = path.column();
        if let Some(alias) = path.alias() {
            steps.push(QueryPlanStep::Select {
                expression: format!("{} as {}", column, alias),
            });
        }
        steps.push(QueryPlanStep::OrderBy { column, direction });
    }
    Ok(())
}

fn translate_properties<R: ModelRegistry + ?Sized>(
    steps: &mut Vec<QueryPlanStep>,
    key: &str,
    value: &Value,
    registry: &R,
) -> Result<(), QueryError> {
    for (model_name, properties) in parse_properties_expression(value)? {
        let model = registry
            .lookup_model(&model_name)
            .ok_or_else(|| QueryError::InvalidModelReference {
                model: model_name.clone(),
                key: key.to_string(),
                value: bound_text(value),
            })?;
        let model = model.name.clone();
        steps.push(if key == "pick" {
            QueryPlanStep::Pick { model, properties }
        } else {
            QueryPlanStep::Omit { model, properties }
        });
    }
    Ok(())
}
