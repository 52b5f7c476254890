//! Architect models: declarative model schemas, relations and query translation.

pub mod case;
pub mod config;
pub mod error;
pub mod migration;
pub mod query;
pub mod relation;
pub mod schema;

pub use config::{
    from_json_str, load_from_path, resolve, sort_models, ModelDefinition, ModelDescriptor, ModelRegistry,
    ModelsConfig, ResolvedModels, ScopeDefinition, Settings,
};
pub use error::{AppError, ConfigError, ErrorBody, QueryError, RelationError, SchemaError};
pub use migration::{render_migrations, Migration};
pub use query::{translate_query, translate_scope, AllowedKeys, QueryBuilder, QueryPlan, QueryPlanStep, QuerySpec};
pub use relation::{compile_relations, convert_relation, RelationDescriptor, RelationKind};
pub use schema::{compile_model_schema, compile_parameters, compile_schema, convert_schema, expand, ConvertOptions};
