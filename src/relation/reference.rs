//! `Model.property` key references.

use crate::config::ModelRegistry;
use crate::error::RelationError;
use crate::relation::naming::{display_reference, through_join};
use crate::relation::ThroughSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A key reference as written: one `Model.property` string, or a list for composite keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinRef {
    Single(String),
    Composite(Vec<String>),
}

impl JoinRef {
    /// Collapse to `Single` unless there is more than one reference.
    pub fn from_list(mut refs: Vec<String>) -> Self {
        if refs.len() == 1 {
            JoinRef::Single(refs.remove(0))
        } else {
            JoinRef::Composite(refs)
        }
    }

    pub fn tokens(&self) -> Vec<&str> {
        match self {
            JoinRef::Single(s) => vec![s.as_str()],
            JoinRef::Composite(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for JoinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinRef::Single(s) => f.write_str(s),
            JoinRef::Composite(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

/// Parsed key reference. All properties live on the same model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelReference {
    pub model_name: String,
    pub property_names: Vec<String>,
    /// Whether `model_name` names a registered model.
    pub known: bool,
}

impl ModelReference {
    pub fn parse<R: ModelRegistry + ?Sized>(
        reference: &JoinRef,
        registry: &R,
        allow_unknown: bool,
    ) -> Result<Self, RelationError> {
        let mut parsed: Option<ModelReference> = None;
        for token in reference.tokens() {
            let (model_name, property_name) = token
                .split_once('.')
                .filter(|(m, p)| !m.is_empty() && !p.is_empty())
                .ok_or_else(|| RelationError::InvalidReference(token.to_string()))?;
            match parsed.as_mut() {
                None => {
                    let known = registry.lookup_model(model_name).is_some();
                    if !known && !allow_unknown {
                        return Err(RelationError::UnknownModel(token.to_string()));
                    }
                    parsed = Some(ModelReference {
                        model_name: model_name.to_string(),
                        property_names: vec![property_name.to_string()],
                        known,
                    });
                }
                Some(existing) if existing.model_name == model_name => {
                    existing.property_names.push(property_name.to_string());
                }
                Some(_) => return Err(RelationError::MixedModels(token.to_string())),
            }
        }
        parsed.ok_or_else(|| RelationError::InvalidReference(reference.to_string()))
    }

    pub fn to_value(&self) -> JoinRef {
        JoinRef::from_list(
            self.property_names
                .iter()
                .map(|p| format!("{}.{}", self.model_name, p))
                .collect(),
        )
    }

    /// Auto-generate the through join from this key to `to`.
    pub fn build_through(&self, to: &ModelReference, inverse: bool) -> Result<ThroughSpec, RelationError> {
        let join = through_join(
            &self.model_name,
            &self.property_names,
            &to.model_name,
            &to.property_names,
            inverse,
        )?;
        Ok(ThroughSpec {
            table: join.table,
            from: JoinRef::from_list(join.from),
            to: JoinRef::from_list(join.to),
            model: None,
        })
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_reference(&self.model_name, &self.property_names))
    }
}
