//! Typed errors and HTTP mapping.
//!
//! Misconfigured models (schema, relation and definition errors) map to 5xx;
//! malformed request input (query translation, parameter decoding) maps to 4xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("malformed schema at '{path}': {message}")]
    Malformed { path: String, message: String },
}

impl SchemaError {
    pub(crate) fn malformed(path: &str, message: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: if path.is_empty() { "#".into() } else { path.to_string() },
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelationError {
    #[error("unknown model reference: {0}")]
    UnknownModel(String),
    #[error("invalid model reference '{0}': expected 'Model.property'")]
    InvalidReference(String),
    #[error("composite keys need to be defined on the same table: {0}")]
    MixedModels(String),
    #[error("unable to create through join for composite keys from '{from}' to '{to}'")]
    CompositeKeyMismatch { from: String, to: String },
    #[error("unrecognized relation: {0}")]
    UnrecognizedRelation(String),
    #[error("the relation needs a `{0}` definition")]
    MissingEndpoint(&'static str),
    #[error("the relation needs a `through.from` and `through.to` definition")]
    IncompleteThrough,
    #[error("both sides of the `through` definition need to be on the same join model")]
    AmbiguousThroughModel,
    #[error("unknown scope '{scope}' on model '{model}'")]
    UnknownScope { model: String, scope: String },
    #[error("unsupported through join definition on {0} relation")]
    UnsupportedThrough(String),
    #[error("{model}.relations.{relation}: {source}")]
    InRelation {
        model: String,
        relation: String,
        #[source]
        source: Box<RelationError>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid range: [{start}, {end}]")]
    InvalidRange { start: String, end: String },
    #[error("invalid '{key}' value: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("can only order by model's own properties and by one-to-one relations' properties: '{0}'")]
    OrderThroughRelation(String),
    #[error("unsupported 'where' query: '{0}'")]
    UnsupportedWhere(String),
    #[error("invalid reference to model '{model}' in '{key}={value}'")]
    InvalidModelReference { model: String, key: String, value: String },
    #[error("invalid properties expression '{value}': {message}")]
    InvalidPropertiesExpression { value: String, message: String },
    #[error("unknown property '{reference}' on model '{model}'")]
    UnknownProperty { model: String, reference: String },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("unknown scope '{scope}' on model '{model}'")]
    UnknownScope { model: String, scope: String },
    #[error("query parameter '{0}' is not supported")]
    UnsupportedParameter(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("{model}: {source}")]
    Schema {
        model: String,
        #[source]
        source: SchemaError,
    },
    #[error(transparent)]
    Relation(#[from] RelationError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Relation(#[from] RelationError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("validation: {message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Schema(_) | AppError::Relation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Query(_) => StatusCode::BAD_REQUEST,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) | AppError::Schema(_) | AppError::Relation(_) => "config_error",
            AppError::Query(_) => "bad_request",
            AppError::Validation { .. } => "validation_error",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        let details = match err {
            AppError::Validation { details, .. } => details.clone(),
            _ => None,
        };
        ErrorBody {
            error: ErrorDetail {
                code: err.code().to_string(),
                message: err.to_string(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody::from(&self);
        (status, Json(body)).into_response()
    }
}
