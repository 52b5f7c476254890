//! Named model scopes compiled into query plans.

use crate::config::{ModelRegistry, ScopeDefinition};
use crate::error::QueryError;
use crate::query::builder::{QueryPlan, QueryPlanStep};
use crate::query::params::{translate_query, AllowedKeys};
use crate::query::path::resolve_path;
use serde_json::Map;

pub fn find_scope<'a, R: ModelRegistry + ?Sized>(
    model: &str,
    name: &str,
    registry: &'a R,
) -> Result<&'a ScopeDefinition, QueryError> {
    let descriptor = registry
        .lookup_model(model)
        .ok_or_else(|| QueryError::UnknownModel(model.to_string()))?;
    descriptor.scope(name).ok_or_else(|| QueryError::UnknownScope {
        model: descriptor.name.clone(),
        scope: name.to_string(),
    })
}

/// Steps of scope `name` on `model`: selected columns first, then its `where` and `order`.
pub fn translate_scope<R: ModelRegistry + ?Sized>(
    model: &str,
    name: &str,
    registry: &R,
) -> Result<QueryPlan, QueryError> {
    let scope = find_scope(model, name, registry)?;
    let mut steps = Vec::with_capacity(scope.select.len());
    for property in &scope.select {
        let path = resolve_path(model, property, registry)?;
        steps.push(QueryPlanStep::Select {
            expression: path.column(),
        });
    }
    let mut params = Map::new();
    if let Some(filter) = &scope.filter {
        params.insert("where".into(), filter.clone());
    }
    if let Some(order) = &scope.order {
        params.insert("order".into(), order.clone());
    }
    steps.extend(translate_query(&params, &AllowedKeys::all(), model, registry)?.steps);
    Ok(QueryPlan { steps })
}
