//! Raw model definition types as authored in JSON.

use crate::relation::JoinRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdPropertyConfig {
    Single(String),
    Composite(Vec<String>),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub id_property: Option<IdPropertyConfig>,
    /// Adds `createdAt` / `updatedAt` timestamps filled in at write time.
    #[serde(default)]
    pub timestamps: bool,
    /// Property schemas, shorthand allowed.
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub relations: IndexMap<String, RelationDefinition>,
    /// Named query narrowings, referenced by relation `scope` and the `scope` parameter.
    #[serde(default)]
    pub scopes: IndexMap<String, ScopeDefinition>,
}

impl ModelDefinition {
    pub fn table_name(&self) -> String {
        self.table_name.clone().unwrap_or_else(|| self.name.clone())
    }

    pub fn id_properties(&self) -> Vec<String> {
        match &self.id_property {
            Some(IdPropertyConfig::Single(s)) => vec![s.clone()],
            Some(IdPropertyConfig::Composite(v)) => v.clone(),
            None => vec!["id".into()],
        }
    }

    /// Declared properties followed by the timestamp properties, if enabled.
    pub fn all_properties(&self) -> Map<String, Value> {
        let mut properties = self.properties.clone();
        if self.timestamps {
            for name in ["createdAt", "updatedAt"] {
                if !properties.contains_key(name) {
                    properties.insert(
                        name.into(),
                        json!({ "type": "timestamp", "default": "now()" }),
                    );
                }
            }
        }
        properties
    }

    /// Declared scopes followed by `timeStamped`, if timestamps are enabled.
    pub fn all_scopes(&self) -> IndexMap<String, ScopeDefinition> {
        let mut scopes = self.scopes.clone();
        if self.timestamps && !scopes.contains_key(TIMESTAMPED_SCOPE) {
            scopes.insert(
                TIMESTAMPED_SCOPE.into(),
                ScopeDefinition {
                    select: vec!["createdAt".into(), "updatedAt".into()],
                    ..Default::default()
                },
            );
        }
        scopes
    }
}

pub const TIMESTAMPED_SCOPE: &str = "timeStamped";

/// Scope body, e.g. `{ "where": { "published": true }, "order": "createdAt desc" }`.
/// `where` and `order` take the query parameter syntax.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
}

/// Declarative relation, e.g.
/// `{ "relation": "hasMany", "from": "User.id", "to": "Post.authorId", "scope": "published" }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub relation: String,
    #[serde(default)]
    pub from: Option<JoinRef>,
    #[serde(default)]
    pub to: Option<JoinRef>,
    #[serde(default)]
    pub through: Option<ThroughDefinition>,
    /// Name the auto-generated through table after the related model first.
    #[serde(default)]
    pub inverse: bool,
    #[serde(default)]
    pub scope: Option<ModifierDefinition>,
    #[serde(default)]
    pub modify: Option<ModifierDefinition>,
    #[serde(default)]
    pub filter: Option<ModifierDefinition>,
    /// Lower-level join description, passed through as given.
    #[serde(default)]
    pub join: Option<JoinDefinition>,
    /// Remaining keys are carried over to the resolved relation.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThroughDefinition {
    /// `through: true` asks for the auto-generated join table.
    Auto(bool),
    Join {
        #[serde(default)]
        from: Option<JoinRef>,
        #[serde(default)]
        to: Option<JoinRef>,
        #[serde(default, alias = "modelClass")]
        model: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinDefinition {
    pub from: JoinRef,
    pub to: JoinRef,
    #[serde(default)]
    pub through: Option<ThroughDefinition>,
}

/// Scope names or a declarative `where` filter narrowing a relation's query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifierDefinition {
    Scope(String),
    Scopes(Vec<String>),
    Filter(Map<String, Value>),
}

/// All model definitions of an application.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub models: Vec<ModelDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_relation_shapes() {
        let def: ModelDefinition = serde_json::from_value(json!({
            "name": "User",
            "idProperty": ["orgId", "id"],
            "timestamps": true,
            "properties": { "name": "string" },
            "relations": {
                "roles": {
                    "relation": "manyToMany",
                    "from": "User.id",
                    "to": "Role.id",
                    "through": true,
                    "scope": ["active", "ordered"],
                    "eager": true
                },
                "posts": {
                    "relation": "hasMany",
                    "from": "User.id",
                    "to": "Post.authorId",
                    "filter": { "published": true }
                }
            }
        }))
        .unwrap();
        assert_eq!(def.id_properties(), vec!["orgId", "id"]);
        assert_eq!(def.table_name(), "User");
        let roles = &def.relations["roles"];
        assert_eq!(roles.through, Some(ThroughDefinition::Auto(true)));
        assert_eq!(
            roles.scope,
            Some(ModifierDefinition::Scopes(vec!["active".into(), "ordered".into()]))
        );
        assert_eq!(roles.rest["eager"], json!(true));
        assert!(matches!(
            def.relations["posts"].filter,
            Some(ModifierDefinition::Filter(_))
        ));
        let keys: Vec<_> = def.all_properties().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "createdAt", "updatedAt"]);
    }

    #[test]
    fn keeps_declared_scopes() {
        let def: ModelDefinition = serde_json::from_value(json!({
            "name": "Post",
            "timestamps": true,
            "properties": { "published": "boolean" },
            "scopes": {
                "published": { "where": { "published": true }, "order": "createdAt desc" }
            }
        }))
        .unwrap();
        assert_eq!(def.scopes["published"].filter, Some(json!({ "published": true })));
        assert_eq!(def.scopes["published"].order, Some(json!("createdAt desc")));

        let scopes = def.all_scopes();
        let names: Vec<_> = scopes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["published", TIMESTAMPED_SCOPE]);
        assert_eq!(scopes[TIMESTAMPED_SCOPE].select, vec!["createdAt", "updatedAt"]);
    }
}
