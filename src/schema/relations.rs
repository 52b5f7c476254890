//! Schema properties derived from a model's relations.
//!
//! A relation property accepts either full related objects (`$ref`) or bare
//! id references to existing rows.

use crate::config::ModelRegistry;
use crate::error::SchemaError;
use crate::relation::RelationDescriptor;
use crate::schema::convert::{convert_schema, ConvertOptions};
use serde_json::{json, Map, Value};

fn id_reference<R: ModelRegistry + ?Sized>(
    relation: &RelationDescriptor,
    registry: &R,
    options: &ConvertOptions,
) -> Result<Value, SchemaError> {
    let related = registry.lookup_model(&relation.related_model);
    let ids = related
        .map(|m| m.id_properties.clone())
        .unwrap_or_else(|| vec!["id".into()]);
    let mut properties = Map::with_capacity(ids.len());
    for id in ids {
        let declared = related.and_then(|m| m.properties.get(&id));
        let mut schema = match declared {
            Some(schema) => convert_schema(schema, options)?,
            None => json!({ "type": "integer" }),
        };
        if let Value::Object(map) = &mut schema {
            map.insert("reference".into(), Value::Bool(true));
        }
        properties.insert(id, schema);
    }
    Ok(json!({ "type": "object", "properties": properties }))
}

/// Property schema for a relation: nullable single value for one-to-one
/// relations, an array otherwise.
pub fn relation_property<R: ModelRegistry + ?Sized>(
    relation: &RelationDescriptor,
    registry: &R,
    options: &ConvertOptions,
) -> Result<Value, SchemaError> {
    let id_reference = id_reference(relation, registry, options)?;
    let reference = json!({ "$ref": relation.related_model });
    Ok(if relation.kind.is_one_to_one() {
        json!({ "anyOf": [{ "type": "null" }, id_reference, reference] })
    } else {
        json!({
            "type": "array",
            "items": { "anyOf": [id_reference, reference] },
            "additionalItems": false
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelDescriptor;
    use crate::relation::{Join, JoinRef, RelationKind};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn relation(kind: RelationKind, related: &str) -> RelationDescriptor {
        RelationDescriptor {
            kind,
            related_model: related.into(),
            join: Join {
                from: JoinRef::Single("Post.authorId".into()),
                to: JoinRef::Single(format!("{}.id", related)),
                through: None,
            },
            modify: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn one_to_one_accepts_null_id_or_object() {
        let mut user = ModelDescriptor::named("User");
        user.properties.insert("id".into(), json!({ "type": "integer", "primary": true }));
        let models: HashMap<String, ModelDescriptor> = [("User".to_string(), user)].into();
        let schema = relation_property(
            &relation(RelationKind::BelongsToOne, "User"),
            &models,
            &ConvertOptions::default(),
        )
        .unwrap();
        assert_eq!(
            schema,
            json!({
                "anyOf": [
                    { "type": "null" },
                    {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "primary": true, "reference": true }
                        }
                    },
                    { "$ref": "User" }
                ]
            })
        );
    }

    #[test]
    fn to_many_is_an_array_with_default_id() {
        let models: HashMap<String, ModelDescriptor> =
            [("Comment".to_string(), ModelDescriptor::named("Comment"))].into();
        let schema = relation_property(
            &relation(RelationKind::HasMany, "Comment"),
            &models,
            &ConvertOptions::default(),
        )
        .unwrap();
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["additionalItems"], false);
        assert_eq!(
            schema["items"]["anyOf"][0]["properties"]["id"],
            json!({ "type": "integer", "reference": true })
        );
        assert_eq!(schema["items"]["anyOf"][1], json!({ "$ref": "Comment" }));
    }
}
