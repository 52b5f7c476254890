//! Model definition validation: names, keys and relation consistency.

use crate::config::{IdPropertyConfig, ModelsConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

fn is_identifier(name: &str) -> bool {
    identifier().is_match(name)
}

pub fn validate(config: &ModelsConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for model in &config.models {
        if !is_identifier(&model.name) {
            return Err(ConfigError::Validation(format!(
                "invalid model name '{}'",
                model.name
            )));
        }
        if !names.insert(model.name.as_str()) {
            return Err(ConfigError::DuplicateModel(model.name.clone()));
        }

        let ids = model.id_properties();
        if ids.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: idProperty must name at least one property",
                model.name
            )));
        }
        // An explicit key must be declared; the default `id` is implicit.
        if model.id_property.is_some() && model.id_property != Some(IdPropertyConfig::Single("id".into())) {
            for id in &ids {
                if !model.properties.contains_key(id) {
                    return Err(ConfigError::MissingReference {
                        kind: "id property",
                        id: format!("{}.{}", model.name, id),
                    });
                }
            }
        }

        let properties = model.all_properties();
        for (name, relation) in &model.relations {
            if properties.contains_key(name) {
                return Err(ConfigError::Validation(format!(
                    "{}: relation '{}' clashes with a property of the same name",
                    model.name, name
                )));
            }
            if relation.join.is_none() && (relation.from.is_none() || relation.to.is_none()) {
                return Err(ConfigError::Validation(format!(
                    "{}.relations.{}: relation needs `from` and `to`",
                    model.name, name
                )));
            }
        }
    }
    Ok(())
}
