//! Query parameter translation.

pub mod builder;
pub mod filter;
pub mod params;
pub mod path;
pub mod properties;
pub mod scope;
pub mod spec;

pub use builder::{Direction, QueryBuilder, QueryPlan, QueryPlanStep, WhereKind};
pub use filter::{flatten_where, translate_where, FilterOperator, QueryFilter};
pub use params::{translate_query, AllowedKeys};
pub use path::{resolve_path, PropertyPath};
pub use properties::{parse_properties_expression, PropertiesExpression};
pub use scope::{find_scope, translate_scope};
pub use spec::QuerySpec;
