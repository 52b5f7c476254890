//! Resolution of declarative relations into join descriptors.

pub mod naming;
mod reference;

pub use reference::{JoinRef, ModelReference};

use crate::case::to_camel_case;
use crate::config::{JoinDefinition, ModelRegistry, ModifierDefinition, RelationDefinition, ThroughDefinition};
use crate::error::{QueryError, RelationError};
use crate::query::{translate_where, QueryBuilder, WhereKind};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RelationKind {
    #[serde(rename = "belongsTo")]
    BelongsToOne,
    #[serde(rename = "hasOne")]
    HasOne,
    #[serde(rename = "hasOneThrough")]
    HasOneThrough,
    #[serde(rename = "hasMany")]
    HasMany,
    #[serde(rename = "manyToMany")]
    ManyToMany,
}

impl RelationKind {
    /// Accepts `belongsTo`, `has_many`, `many-to-many`, `HasOneRelation` and similar spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let camel = to_camel_case(name);
        let name = camel.strip_suffix("Relation").unwrap_or(&camel);
        Some(match name {
            "belongsTo" | "belongsToOne" | "BelongsToOne" => RelationKind::BelongsToOne,
            "hasOne" | "HasOne" => RelationKind::HasOne,
            "hasOneThrough" | "HasOneThrough" => RelationKind::HasOneThrough,
            "hasMany" | "HasMany" => RelationKind::HasMany,
            "manyToMany" | "ManyToMany" => RelationKind::ManyToMany,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            RelationKind::BelongsToOne => "belongsTo",
            RelationKind::HasOne => "hasOne",
            RelationKind::HasOneThrough => "hasOneThrough",
            RelationKind::HasMany => "hasMany",
            RelationKind::ManyToMany => "manyToMany",
        }
    }

    /// Kinds joined through an intermediate table.
    pub fn is_through(self) -> bool {
        matches!(self, RelationKind::HasOneThrough | RelationKind::ManyToMany)
    }

    pub fn is_one_to_one(self) -> bool {
        matches!(
            self,
            RelationKind::BelongsToOne | RelationKind::HasOne | RelationKind::HasOneThrough
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThroughSpec {
    pub table: String,
    pub from: JoinRef,
    pub to: JoinRef,
    /// Join model, when the through table is a registered model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Join {
    pub from: JoinRef,
    pub to: JoinRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<ThroughSpec>,
}

/// Narrowing applied to every query of a relation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryModifier {
    Scopes(Vec<String>),
    /// Declarative filter in `where` syntax, applied against the related model.
    Filter(Map<String, Value>),
}

impl QueryModifier {
    fn from_definition(definition: &ModifierDefinition) -> Self {
        match definition {
            ModifierDefinition::Scope(name) => QueryModifier::Scopes(vec![name.clone()]),
            ModifierDefinition::Scopes(names) => QueryModifier::Scopes(names.clone()),
            ModifierDefinition::Filter(filter) => QueryModifier::Filter(filter.clone()),
        }
    }

    /// Apply to a query on `model`, the relation's related model.
    pub fn apply<B, R>(&self, builder: &mut B, model: &str, registry: &R) -> Result<(), QueryError>
    where
        B: QueryBuilder + ?Sized,
        R: ModelRegistry + ?Sized,
    {
        match self {
            QueryModifier::Scopes(names) => builder.merge_scope(names),
            QueryModifier::Filter(filter) => {
                let filter = Value::Object(filter.clone());
                for step in translate_where(WhereKind::And, &filter, model, registry)? {
                    step.apply(builder);
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDescriptor {
    #[serde(rename = "relation")]
    pub kind: RelationKind,
    pub related_model: String,
    pub join: Join,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify: Option<QueryModifier>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RelationDescriptor {
    /// Properties of the owning model used as join keys.
    pub fn own_keys<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.join.from.tokens().into_iter().filter_map(move |token| {
            token
                .split_once('.')
                .filter(|(m, _)| *m == model)
                .map(|(_, p)| p)
        })
    }
}

/// Resolve one relation definition against the registered models.
pub fn convert_relation<R: ModelRegistry + ?Sized>(
    definition: &RelationDefinition,
    registry: &R,
) -> Result<RelationDescriptor, RelationError> {
    let kind = RelationKind::from_name(&definition.relation)
        .ok_or_else(|| RelationError::UnrecognizedRelation(definition.relation.clone()))?;
    let modify = definition
        .scope
        .as_ref()
        .or(definition.modify.as_ref())
        .or(definition.filter.as_ref())
        .map(QueryModifier::from_definition);

    if let Some(join) = &definition.join {
        return pass_through(kind, join, modify, definition.rest.clone(), registry);
    }

    let from = definition
        .from
        .as_ref()
        .ok_or(RelationError::MissingEndpoint("from"))?;
    let to = definition
        .to
        .as_ref()
        .ok_or(RelationError::MissingEndpoint("to"))?;
    let from = ModelReference::parse(from, registry, false)?;
    let to = ModelReference::parse(to, registry, false)?;
    if let (Some(QueryModifier::Scopes(names)), Some(related)) = (&modify, registry.lookup_model(&to.model_name)) {
        if let Some(name) = names.iter().find(|name| related.scope(name).is_none()) {
            return Err(RelationError::UnknownScope {
                model: related.name.clone(),
                scope: name.clone(),
            });
        }
    }

    let through = if kind.is_through() {
        Some(match &definition.through {
            None | Some(ThroughDefinition::Auto(_)) => from.build_through(&to, definition.inverse)?,
            Some(ThroughDefinition::Join { from: Some(through_from), to: Some(through_to), model }) => {
                resolve_through(through_from, through_to, model.as_deref(), registry)?
            }
            Some(ThroughDefinition::Join { .. }) => return Err(RelationError::IncompleteThrough),
        })
    } else {
        match &definition.through {
            None | Some(ThroughDefinition::Auto(false)) => None,
            Some(_) => return Err(RelationError::UnsupportedThrough(kind.name().into())),
        }
    };

    tracing::debug!(
        relation = kind.name(),
        from = %from,
        to = %to,
        through = through.as_ref().map(|t| t.table.as_str()).unwrap_or(""),
        "resolved relation"
    );

    Ok(RelationDescriptor {
        kind,
        related_model: to.model_name.clone(),
        join: Join {
            from: from.to_value(),
            to: to.to_value(),
            through,
        },
        modify,
        extra: definition.rest.clone(),
    })
}

/// `through.from` / `through.to` either both reference one join model, or are raw
/// references into a join table.
fn resolve_through<R: ModelRegistry + ?Sized>(
    from: &JoinRef,
    to: &JoinRef,
    model: Option<&str>,
    registry: &R,
) -> Result<ThroughSpec, RelationError> {
    let through_from = ModelReference::parse(from, registry, true)?;
    let through_to = ModelReference::parse(to, registry, true)?;
    if (through_from.known || through_to.known) && through_from.model_name != through_to.model_name {
        return Err(RelationError::AmbiguousThroughModel);
    }
    if through_from.known {
        let (table, join_model) = registry
            .lookup_model(&through_from.model_name)
            .map(|m| (m.table_name.clone(), m.name.clone()))
            .unwrap_or_else(|| (through_from.model_name.clone(), through_from.model_name.clone()));
        Ok(ThroughSpec {
            table,
            from: through_from.to_value(),
            to: through_to.to_value(),
            model: Some(join_model),
        })
    } else {
        Ok(ThroughSpec {
            table: through_from.model_name.clone(),
            from: from.clone(),
            to: to.clone(),
            model: model.map(str::to_string),
        })
    }
}

/// The related model is `modelClass`, or the model registered under the `join.to` name.
fn pass_through<R: ModelRegistry + ?Sized>(
    kind: RelationKind,
    join: &JoinDefinition,
    modify: Option<QueryModifier>,
    extra: Map<String, Value>,
    registry: &R,
) -> Result<RelationDescriptor, RelationError> {
    let table_of = |r: &JoinRef| {
        r.tokens()
            .first()
            .and_then(|t| t.split_once('.'))
            .map(|(table, _)| table.to_string())
            .ok_or_else(|| RelationError::InvalidReference(r.to_string()))
    };
    let through = match (&join.through, kind.is_through()) {
        (Some(ThroughDefinition::Join { from: Some(from), to: Some(to), model }), true) => {
            Some(ThroughSpec {
                table: table_of(from)?,
                from: from.clone(),
                to: to.clone(),
                model: model.clone(),
            })
        }
        (_, true) => return Err(RelationError::IncompleteThrough),
        (None, false) => None,
        (Some(_), false) => return Err(RelationError::UnsupportedThrough(kind.name().into())),
    };
    let related_model = match extra.get("modelClass").and_then(Value::as_str) {
        Some(model) => model.to_string(),
        None => registry
            .lookup_model(&table_of(&join.to)?)
            .map(|model| model.name.clone())
            .ok_or(RelationError::MissingEndpoint("modelClass"))?,
    };
    Ok(RelationDescriptor {
        kind,
        related_model,
        join: Join {
            from: join.from.clone(),
            to: join.to.clone(),
            through,
        },
        modify,
        extra,
    })
}

/// Resolve all relations declared on `model`, naming the failing relation in errors.
pub fn compile_relations<R: ModelRegistry + ?Sized>(
    model: &str,
    relations: &IndexMap<String, RelationDefinition>,
    registry: &R,
) -> Result<IndexMap<String, RelationDescriptor>, RelationError> {
    let mut converted = IndexMap::with_capacity(relations.len());
    for (name, definition) in relations {
        let descriptor = convert_relation(definition, registry).map_err(|err| RelationError::InRelation {
            model: model.to_string(),
            relation: name.clone(),
            source: Box::new(err),
        })?;
        converted.insert(name.clone(), descriptor);
    }
    Ok(converted)
}
