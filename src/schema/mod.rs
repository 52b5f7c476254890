//! Model schema compilation: shorthand expansion, conversion to validation
//! schemas, relation-derived properties and action parameters.

pub mod convert;
pub mod parameters;
pub mod relations;
pub mod shorthand;
pub mod types;

pub use convert::{add_format, convert_schema, expand_properties, make_nullable, ConvertOptions};
pub use parameters::{compile_parameters, ParameterDefinition, ParameterSchema};
pub use relations::relation_property;
pub use shorthand::{expand, Shorthand};
pub use types::{JsonType, TypeKind};

use crate::config::{ModelDefinition, ModelDescriptor, ModelRegistry};
use crate::error::SchemaError;
use serde_json::{json, Map, Value};

/// Compile a model's own properties into a closed object schema identified by the model name.
pub fn compile_schema(definition: &ModelDefinition, options: &ConvertOptions) -> Result<Value, SchemaError> {
    let properties = definition.all_properties();
    object_schema(&definition.name, &properties, options)
}

/// Like [`compile_schema`], adding one property per resolved relation.
pub fn compile_model_schema<R: ModelRegistry + ?Sized>(
    model: &ModelDescriptor,
    registry: &R,
    options: &ConvertOptions,
) -> Result<Value, SchemaError> {
    let mut schema = object_schema(&model.name, &model.properties, options)?;
    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        for (name, relation) in &model.relations {
            properties.insert(name.clone(), relation_property(relation, registry, options)?);
        }
    }
    Ok(schema)
}

fn object_schema(
    name: &str,
    properties: &Map<String, Value>,
    options: &ConvertOptions,
) -> Result<Value, SchemaError> {
    let converted = convert_schema(
        &json!({ "type": "object", "properties": properties }),
        options,
    )?;
    let mut schema = Map::new();
    schema.insert("$id".into(), json!(name));
    if let Value::Object(map) = converted {
        schema.extend(map);
    }
    if !schema.contains_key("properties") {
        schema.insert("properties".into(), json!({}));
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    Ok(Value::Object(schema))
}
