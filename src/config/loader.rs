//! Load model definitions from JSON and resolve them into a model registry.

use crate::config::resolved::{ModelDescriptor, ModelRegistry, ResolvedModels};
use crate::config::types::*;
use crate::config::{validate, Settings};
use crate::error::ConfigError;
use crate::relation::{compile_relations, RelationKind};
use crate::schema::{compile_model_schema, ConvertOptions};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Register, resolve and compile all models (validates first).
///
/// Registration is two-pass: every model name and property set is known before
/// any relation is resolved, so relations may point forward.
pub fn resolve(config: &ModelsConfig, settings: &Settings) -> Result<ResolvedModels, ConfigError> {
    validate(config)?;

    let mut descriptors: HashMap<String, ModelDescriptor> = config
        .models
        .iter()
        .map(|definition| (definition.name.clone(), ModelDescriptor::from_definition(definition)))
        .collect();

    let mut compiled = Vec::with_capacity(config.models.len());
    for definition in &config.models {
        let relations = compile_relations(&definition.name, &definition.relations, &descriptors)?;
        compiled.push((definition.name.clone(), relations));
    }
    for (name, relations) in compiled {
        if let Some(descriptor) = descriptors.get_mut(&name) {
            descriptor.relations = relations;
        }
    }

    let declared: Vec<String> = config.models.iter().map(|m| m.name.clone()).collect();
    let order = sort_models(&declared, &descriptors);

    let options = ConvertOptions::default();
    let mut schemas = HashMap::with_capacity(order.len());
    for name in &order {
        let model = descriptors.get(name).ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: name.clone(),
        })?;
        let schema = compile_model_schema(model, &descriptors, &options).map_err(|source| {
            ConfigError::Schema {
                model: name.clone(),
                source,
            }
        })?;
        if settings.log_schema {
            tracing::info!(model = %name, schema = %schema, "compiled model schema");
        }
        schemas.insert(name.clone(), schema);
    }

    let mut models = Vec::with_capacity(order.len());
    for name in &order {
        if let Some(model) = descriptors.remove(name) {
            models.push(model);
        }
    }
    tracing::info!(models = models.len(), "resolved models");
    Ok(ResolvedModels::new(models, schemas))
}

/// Order models so each comes before the models its relations point to.
/// Belongs-to targets, self references and unknown models do not count; join
/// models of through relations do.
pub fn sort_models<R: ModelRegistry + ?Sized>(names: &[String], registry: &R) -> Vec<String> {
    fn visit<R: ModelRegistry + ?Sized>(
        name: &str,
        registry: &R,
        seen: &mut HashSet<String>,
        sorted: &mut Vec<String>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(model) = registry.lookup_model(name) {
            for relation in model.relations.values() {
                if relation.kind == RelationKind::BelongsToOne {
                    continue;
                }
                let through = relation.join.through.as_ref().and_then(|t| t.model.as_deref());
                for related in std::iter::once(relation.related_model.as_str()).chain(through) {
                    if related != name && registry.contains_model(related) {
                        visit(related, registry, seen, sorted);
                    }
                }
            }
        }
        sorted.push(name.to_string());
    }

    let mut seen = HashSet::new();
    let mut sorted = Vec::with_capacity(names.len());
    for name in names.iter().rev() {
        visit(name, registry, &mut seen, &mut sorted);
    }
    sorted.reverse();
    sorted
}

/// Files hold a list of definitions, `{ "models": [...] }`, or a single definition.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModelsFile {
    List(Vec<ModelDefinition>),
    Config(ModelsConfig),
    Single(Box<ModelDefinition>),
}

pub fn from_json_str(json: &str) -> Result<ModelsConfig, ConfigError> {
    let file: ModelsFile = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    Ok(match file {
        ModelsFile::List(models) => ModelsConfig { models },
        ModelsFile::Config(config) => config,
        ModelsFile::Single(model) => ModelsConfig { models: vec![*model] },
    })
}

/// Load a JSON file, or every `*.json` file of a directory in file name order.
pub fn load_from_path(path: &Path) -> Result<ModelsConfig, ConfigError> {
    let load_error = |e: std::io::Error| ConfigError::Load(format!("{}: {}", path.display(), e));
    if !path.is_dir() {
        let text = std::fs::read_to_string(path).map_err(load_error)?;
        return from_json_str(&text);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(load_error)? {
        let file = entry.map_err(load_error)?.path();
        if file.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(file);
        }
    }
    files.sort();
    let mut config = ModelsConfig::default();
    for file in files {
        tracing::debug!(file = %file.display(), "loading model definitions");
        let text = std::fs::read_to_string(&file)
            .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
        let loaded = from_json_str(&text)
            .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
        config.models.extend(loaded.models);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(models: serde_json::Value) -> ModelsConfig {
        serde_json::from_value(json!({ "models": models })).unwrap()
    }

    #[test]
    fn reads_all_file_shapes() {
        let list = from_json_str(r#"[{ "name": "A" }, { "name": "B" }]"#).unwrap();
        assert_eq!(list.models.len(), 2);
        let wrapped = from_json_str(r#"{ "models": [{ "name": "A" }] }"#).unwrap();
        assert_eq!(wrapped.models[0].name, "A");
        let single = from_json_str(r#"{ "name": "C", "properties": { "x": "string" } }"#).unwrap();
        assert_eq!(single.models[0].name, "C");
        assert!(matches!(from_json_str("{"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn sorts_related_models_after_their_owner() {
        let resolved = resolve(
            &config(json!([
                {
                    "name": "Post",
                    "properties": { "authorId": "integer" },
                    "relations": {
                        "author": { "relation": "belongsTo", "from": "Post.authorId", "to": "User.id" }
                    }
                },
                {
                    "name": "User",
                    "relations": {
                        "posts": { "relation": "hasMany", "from": "User.id", "to": "Post.authorId" }
                    }
                }
            ])),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(resolved.names().collect::<Vec<_>>(), vec!["User", "Post"]);
    }

    #[test]
    fn sorting_survives_cycles() {
        let resolved = resolve(
            &config(json!([
                {
                    "name": "A",
                    "properties": { "bId": "integer" },
                    "relations": { "bs": { "relation": "hasMany", "from": "A.id", "to": "B.aId" } }
                },
                {
                    "name": "B",
                    "properties": { "aId": "integer" },
                    "relations": { "as": { "relation": "hasMany", "from": "B.id", "to": "A.bId" } }
                }
            ])),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(resolved.models.len(), 2);
    }

    #[test]
    fn compiles_schemas_with_relation_properties() {
        let resolved = resolve(
            &config(json!([
                {
                    "name": "User",
                    "properties": { "name": { "type": "string", "required": true } },
                    "relations": {
                        "roles": { "relation": "manyToMany", "from": "User.id", "to": "Role.id" }
                    }
                },
                { "name": "Role", "properties": { "label": "string" } }
            ])),
            &Settings::default(),
        )
        .unwrap();
        let schema = resolved.schema("User").unwrap();
        assert_eq!(schema["$id"], "User");
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["roles"]["type"], "array");
        let roles = &resolved.get("User").unwrap().relations["roles"];
        assert_eq!(roles.join.through.as_ref().unwrap().table, "UserRole");
    }

    #[test]
    fn reports_relation_errors_with_context() {
        let err = resolve(
            &config(json!([{
                "name": "User",
                "relations": { "posts": { "relation": "hasMany", "from": "User.id", "to": "Post.userId" } }
            }])),
            &Settings::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "User.relations.posts: unknown model reference: Post.userId"
        );
    }
}
