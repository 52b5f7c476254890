//! Collecting [`QueryBuilder`] that bundles a translated query into plain data.

use crate::query::builder::{Direction, QueryBuilder, WhereKind};
use crate::query::filter::QueryFilter;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WhereClause {
    pub kind: WhereKind,
    #[serde(flatten)]
    pub filter: QueryFilter,
}

impl std::ops::Deref for WhereClause {
    type Target = QueryFilter;

    fn deref(&self) -> &QueryFilter {
        &self.filter
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderClause {
    pub column: String,
    pub direction: Direction,
}

/// Query state for executors that prefer data over builder calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub filters: Vec<WhereClause>,
    pub order: Vec<OrderClause>,
    pub selects: Vec<String>,
    pub range: Option<(i64, i64)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub eager: Vec<String>,
    pub scopes: Vec<String>,
    pub eager_scopes: Vec<String>,
    pub pick: IndexMap<String, Vec<String>>,
    pub omit: IndexMap<String, Vec<String>>,
}

fn merge_unique(target: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

impl QueryBuilder for QuerySpec {
    fn where_(&mut self, kind: WhereKind, filter: &QueryFilter) {
        self.filters.push(WhereClause {
            kind,
            filter: filter.clone(),
        });
    }

    fn order_by(&mut self, column: &str, direction: Direction) {
        self.order.push(OrderClause {
            column: column.to_string(),
            direction,
        });
    }

    fn select(&mut self, expression: &str) {
        merge_unique(&mut self.selects, &[expression.to_string()]);
    }

    fn range(&mut self, start: i64, end: i64) {
        self.range = Some((start, end));
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    fn merge_eager(&mut self, expression: &str) {
        merge_unique(&mut self.eager, &[expression.to_string()]);
    }

    fn merge_scope(&mut self, names: &[String]) {
        merge_unique(&mut self.scopes, names);
    }

    fn merge_eager_scope(&mut self, names: &[String]) {
        merge_unique(&mut self.eager_scopes, names);
    }

    fn pick(&mut self, model: &str, properties: &[String]) {
        merge_unique(self.pick.entry(model.to_string()).or_default(), properties);
    }

    fn omit(&mut self, model: &str, properties: &[String]) {
        merge_unique(self.omit.entry(model.to_string()).or_default(), properties);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::FilterOperator;
    use serde_json::json;

    #[test]
    fn merges_additively_without_duplicates() {
        let mut spec = QuerySpec::default();
        spec.merge_scope(&["active".into(), "recent".into()]);
        spec.merge_scope(&["active".into()]);
        spec.pick("User", &["id".into()]);
        spec.pick("User", &["id".into(), "name".into()]);
        spec.merge_eager("posts");
        spec.merge_eager("posts");
        assert_eq!(spec.scopes, vec!["active", "recent"]);
        assert_eq!(spec.pick["User"], vec!["id", "name"]);
        assert_eq!(spec.eager, vec!["posts"]);
    }

    #[test]
    fn serializes_filters_flat() {
        let mut spec = QuerySpec::default();
        let filter = QueryFilter::new("age", FilterOperator::Ge, json!(18)).unwrap();
        spec.where_(WhereKind::Or, &filter);
        spec.limit(5);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value["filters"][0],
            json!({ "kind": "orWhere", "reference": "age", "operator": ">=", "value": 18 })
        );
        assert_eq!(value["limit"], 5);
    }
}
