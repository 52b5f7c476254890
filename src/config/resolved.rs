//! Resolved model set: definitions registered, relations compiled, schemas built.

use crate::config::{ModelDefinition, ScopeDefinition};
use crate::relation::RelationDescriptor;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Everything the relation resolver and query translator need to know about a model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub table_name: String,
    pub id_properties: Vec<String>,
    /// Property schemas as declared (shorthand allowed), timestamps included.
    pub properties: Map<String, Value>,
    /// Empty until relations are compiled in the second registration pass.
    pub relations: IndexMap<String, RelationDescriptor>,
    pub scopes: IndexMap<String, ScopeDefinition>,
}

impl ModelDescriptor {
    /// Bare model with the default `id` key, table named after the model.
    pub fn named(name: &str) -> Self {
        ModelDescriptor {
            name: name.to_string(),
            table_name: name.to_string(),
            id_properties: vec!["id".into()],
            ..Default::default()
        }
    }

    pub fn from_definition(definition: &ModelDefinition) -> Self {
        ModelDescriptor {
            name: definition.name.clone(),
            table_name: definition.table_name(),
            id_properties: definition.id_properties(),
            properties: definition.all_properties(),
            relations: IndexMap::new(),
            scopes: definition.all_scopes(),
        }
    }

    /// Declared properties, id properties and the model's own join keys.
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.contains_key(property)
            || self.id_properties.iter().any(|id| id == property)
            || self
                .relations
                .values()
                .any(|r| r.own_keys(&self.name).any(|key| key == property))
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeDefinition> {
        self.scopes.get(name)
    }
}

/// Lookup of models by name, the seam between resolution passes and callers.
pub trait ModelRegistry {
    fn lookup_model(&self, name: &str) -> Option<&ModelDescriptor>;

    fn contains_model(&self, name: &str) -> bool {
        self.lookup_model(name).is_some()
    }
}

impl ModelRegistry for HashMap<String, ModelDescriptor> {
    fn lookup_model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.get(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModels {
    /// Models in dependency order.
    pub models: Vec<ModelDescriptor>,
    pub by_name: HashMap<String, usize>,
    /// Compiled validation schema per model name.
    pub schemas: HashMap<String, Value>,
}

impl ResolvedModels {
    pub fn new(models: Vec<ModelDescriptor>, schemas: HashMap<String, Value>) -> Self {
        let by_name = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();
        ResolvedModels {
            models,
            by_name,
            schemas,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.by_name.get(name).map(|&i| &self.models[i])
    }

    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.lookup_model(name).and_then(|m| self.schemas.get(&m.name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }
}

impl ModelRegistry for ResolvedModels {
    /// Exact name first, then `<name>Model`.
    fn lookup_model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.get(name).or_else(|| {
            if name.ends_with("Model") {
                None
            } else {
                self.get(&format!("{}Model", name))
            }
        })
    }
}
