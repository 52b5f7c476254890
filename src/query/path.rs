//! Property paths (`relation.relation.property`) resolved against the model graph.

use crate::case::capitalize;
use crate::config::{ModelDescriptor, ModelRegistry};
use crate::error::QueryError;
use crate::relation::RelationKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRelation {
    pub name: String,
    pub kind: RelationKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyPath {
    /// Relations walked from the root model, in order.
    pub relations: Vec<PathRelation>,
    pub property: String,
    /// Model owning `property`.
    pub model: String,
    /// Table of the root model.
    pub root_table: String,
}

impl PropertyPath {
    /// Column as the query sees it: `table.property` for root properties,
    /// `relation.property` (nested relations joined by `:`) otherwise.
    pub fn column(&self) -> String {
        if self.relations.is_empty() {
            format!("{}.{}", self.root_table, self.property)
        } else {
            let alias: Vec<&str> = self.relations.iter().map(|r| r.name.as_str()).collect();
            format!("{}.{}", alias.join(":"), self.property)
        }
    }

    /// `relationProperty`, named after the innermost relation.
    pub fn alias(&self) -> Option<String> {
        self.relations
            .last()
            .map(|r| format!("{}{}", r.name, capitalize(&self.property)))
    }

    pub fn is_one_to_one(&self) -> bool {
        self.relations.iter().all(|r| r.kind.is_one_to_one())
    }
}

fn lookup<'r, R: ModelRegistry + ?Sized>(registry: &'r R, name: &str) -> Result<&'r ModelDescriptor, QueryError> {
    registry
        .lookup_model(name)
        .ok_or_else(|| QueryError::UnknownModel(name.to_string()))
}

/// Walk `reference` from `model`. Every segment but the last must be a relation;
/// the last must be a property of the model reached.
pub fn resolve_path<R: ModelRegistry + ?Sized>(
    model: &str,
    reference: &str,
    registry: &R,
) -> Result<PropertyPath, QueryError> {
    let root = lookup(registry, model)?;
    let unknown = || QueryError::UnknownProperty {
        model: root.name.clone(),
        reference: reference.to_string(),
    };
    let mut segments: Vec<&str> = reference.split('.').collect();
    let property = segments.pop().filter(|p| !p.is_empty()).ok_or_else(unknown)?;

    let mut current = root;
    let mut relations = Vec::with_capacity(segments.len());
    for segment in segments {
        let relation = current.relation(segment).ok_or_else(unknown)?;
        relations.push(PathRelation {
            name: segment.to_string(),
            kind: relation.kind,
        });
        current = lookup(registry, &relation.related_model)?;
    }
    if !current.has_property(property) {
        return Err(unknown());
    }
    Ok(PropertyPath {
        relations,
        property: property.to_string(),
        model: current.name.clone(),
        root_table: root.table_name.clone(),
    })
}
