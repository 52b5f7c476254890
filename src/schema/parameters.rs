//! Action parameter lists compiled into one validation schema.

use crate::config::ModelRegistry;
use crate::error::{AppError, SchemaError};
use crate::schema::convert::{convert_schema, ConvertOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Key used for a parameter without a name, which stands for the whole input.
pub const ROOT_PARAMETER: &str = "root";

/// A parameter as declared: a bare type name or `{ name?, type?, ...schema }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterDefinition {
    Type(String),
    Full {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "type")]
        type_: Option<Value>,
        #[serde(flatten)]
        rest: Map<String, Value>,
    },
}

impl ParameterDefinition {
    pub fn name(&self) -> Option<&str> {
        match self {
            ParameterDefinition::Type(_) => None,
            ParameterDefinition::Full { name, .. } => name.as_deref(),
        }
    }

    /// Declared type names; `type` may be a single name or a list.
    pub fn type_names(&self) -> Vec<&str> {
        match self {
            ParameterDefinition::Type(name) => vec![name.as_str()],
            ParameterDefinition::Full { type_: Some(Value::String(name)), .. } => vec![name.as_str()],
            ParameterDefinition::Full { type_: Some(Value::Array(names)), .. } => {
                names.iter().filter_map(Value::as_str).collect()
            }
            ParameterDefinition::Full { .. } => Vec::new(),
        }
    }

    fn property_schema(&self) -> Value {
        match self {
            ParameterDefinition::Type(name) => json!({ "type": name }),
            ParameterDefinition::Full { type_, rest, .. } => {
                let mut schema = Map::with_capacity(rest.len() + 1);
                if let Some(type_) = type_ {
                    schema.insert("type".into(), type_.clone());
                }
                schema.extend(rest.clone());
                Value::Object(schema)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSchema {
    pub parameters: Vec<ParameterDefinition>,
    /// `None` when no parameters are declared; any input is accepted.
    pub schema: Option<Value>,
}

/// Compile parameters into an object schema keyed by parameter name (`root` when unnamed).
/// Return values are compiled with `use_instance_of`.
pub fn compile_parameters(
    parameters: &[ParameterDefinition],
    options: &ConvertOptions,
) -> Result<ParameterSchema, SchemaError> {
    let schema = if parameters.is_empty() {
        None
    } else {
        let mut properties = Map::with_capacity(parameters.len());
        for parameter in parameters {
            properties.insert(
                parameter.name().unwrap_or(ROOT_PARAMETER).to_string(),
                parameter.property_schema(),
            );
        }
        Some(convert_schema(&Value::Object(properties), options)?)
    };
    Ok(ParameterSchema {
        parameters: parameters.to_vec(),
        schema,
    })
}

impl ParameterSchema {
    /// Decode JSON-encoded values of object- or model-typed parameters in place.
    ///
    /// Query strings can only carry text, so such parameters arrive serialized.
    /// Every failing parameter is reported.
    pub fn coerce_json<R: ModelRegistry + ?Sized>(
        &self,
        params: &mut Value,
        registry: &R,
    ) -> Result<(), AppError> {
        let mut errors = Vec::new();
        for parameter in &self.parameters {
            let types = parameter.type_names();
            let wants_object = types
                .iter()
                .any(|t| *t == "object" || registry.contains_model(t));
            if !wants_object {
                continue;
            }
            let name = parameter.name();
            let slot = match name {
                Some(name) => params.get_mut(name),
                None => Some(&mut *params),
            };
            let Some(slot) = slot else { continue };
            let Value::String(text) = slot else { continue };
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(decoded) => *slot = decoded,
                Err(err) => errors.push(json!({
                    "dataPath": format!(".{}", name.unwrap_or("")),
                    "keyword": "type",
                    "message": err.to_string(),
                    "params": { "type": types, "json": true }
                })),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(errors = errors.len(), "parameter decoding failed");
            Err(AppError::Validation {
                message: format!("the provided data is not valid: {}", params),
                details: Some(Value::Array(errors)),
            })
        }
    }
}
