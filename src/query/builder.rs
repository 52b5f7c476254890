//! Builder interface the translated query is replayed against.

use crate::query::filter::QueryFilter;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WhereKind {
    #[serde(rename = "where")]
    And,
    #[serde(rename = "orWhere")]
    Or,
}

impl fmt::Display for WhereKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WhereKind::And => "where",
            WhereKind::Or => "orWhere",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }
}

/// Operations a query builder exposes to the translator. Execution is up to the implementor.
pub trait QueryBuilder {
    fn where_(&mut self, kind: WhereKind, filter: &QueryFilter);
    fn order_by(&mut self, column: &str, direction: Direction);
    fn select(&mut self, expression: &str);
    fn range(&mut self, start: i64, end: i64);
    fn limit(&mut self, limit: u64);
    fn offset(&mut self, offset: u64);
    fn merge_eager(&mut self, expression: &str);
    fn merge_scope(&mut self, names: &[String]);
    fn merge_eager_scope(&mut self, names: &[String]);
    fn pick(&mut self, model: &str, properties: &[String]);
    fn omit(&mut self, model: &str, properties: &[String]);
}

/// One builder call, recorded in the order the parameters were received.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum QueryPlanStep {
    Where {
        kind: WhereKind,
        #[serde(flatten)]
        filter: QueryFilter,
    },
    OrderBy { column: String, direction: Direction },
    Select { expression: String },
    Range { start: i64, end: i64 },
    Limit { limit: u64 },
    Offset { offset: u64 },
    MergeEager { expression: String },
    MergeScope { names: Vec<String> },
    MergeEagerScope { names: Vec<String> },
    Pick { model: String, properties: Vec<String> },
    Omit { model: String, properties: Vec<String> },
}

impl QueryPlanStep {
    pub fn apply<B: QueryBuilder + ?Sized>(&self, builder: &mut B) {
        match self {
            QueryPlanStep::Where { kind, filter } => builder.where_(*kind, filter),
            QueryPlanStep::OrderBy { column, direction } => builder.order_by(column, *direction),
            QueryPlanStep::Select { expression } => builder.select(expression),
            QueryPlanStep::Range { start, end } => builder.range(*start, *end),
            QueryPlanStep::Limit { limit } => builder.limit(*limit),
            QueryPlanStep::Offset { offset } => builder.offset(*offset),
            QueryPlanStep::MergeEager { expression } => builder.merge_eager(expression),
            QueryPlanStep::MergeScope { names } => builder.merge_scope(names),
            QueryPlanStep::MergeEagerScope { names } => builder.merge_eager_scope(names),
            QueryPlanStep::Pick { model, properties } => builder.pick(model, properties),
            QueryPlanStep::Omit { model, properties } => builder.omit(model, properties),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryPlan {
    pub steps: Vec<QueryPlanStep>,
}

impl QueryPlan {
    /// Replay every step in order.
    pub fn apply<B: QueryBuilder + ?Sized>(&self, builder: &mut B) {
        for step in &self.steps {
            step.apply(builder);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
