//! CREATE TABLE migrations rendered from resolved models, including the
//! auto-generated join tables of through relations.

use crate::case::to_snake_case;
use crate::config::{ModelDescriptor, ModelRegistry, ResolvedModels, Settings};
use crate::error::ConfigError;
use crate::relation::{JoinRef, RelationDescriptor};
use crate::schema::convert::WRITE_TIME_DEFAULT;
use crate::schema::expand;
use crate::schema::TypeKind;
use crate::schema::JsonType;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashSet;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Migration {
    /// `YYYYMMDDHHMMSS_<table>.sql`
    pub file_name: String,
    pub table: String,
    pub up: String,
    pub down: String,
}

impl Migration {
    pub fn contents(&self) -> String {
        format!("-- up\n{};\n\n-- down\n{};\n", self.up, self.down)
    }
}

pub fn migration_file_name(table: &str, now: NaiveDateTime) -> String {
    format!("{}_{}.sql", now.format("%Y%m%d%H%M%S"), table)
}

struct Names {
    normalize: bool,
}

impl Names {
    fn db(&self, name: &str) -> String {
        if self.normalize {
            to_snake_case(name)
        } else {
            name.to_string()
        }
    }
}

fn column_type(schema: &Value) -> &'static str {
    let Some(name) = schema.get("type").and_then(Value::as_str) else {
        return "JSONB";
    };
    match TypeKind::resolve(name) {
        TypeKind::Json(JsonType::String) => "TEXT",
        TypeKind::Json(JsonType::Integer) => "INTEGER",
        TypeKind::Json(JsonType::Number) => "DOUBLE PRECISION",
        TypeKind::Json(JsonType::Boolean) => "BOOLEAN",
        TypeKind::Json(JsonType::Object | JsonType::Array) => "JSONB",
        TypeKind::Date if name == "date" => "DATE",
        TypeKind::Date => "TIMESTAMPTZ",
        TypeKind::Model(_) => "JSONB",
    }
}

fn default_sql(default: &Value) -> Option<String> {
    match default {
        Value::String(s) if s == WRITE_TIME_DEFAULT => Some("CURRENT_TIMESTAMP".into()),
        Value::String(s) => Some(literal(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string().to_uppercase()),
        Value::Null => None,
        other => Some(format!("{}::jsonb", literal(&other.to_string()))),
    }
}

fn split_reference(token: &str) -> Option<(&str, &str)> {
    token.split_once('.')
}

fn single_token(reference: &JoinRef) -> Option<&str> {
    match reference {
        JoinRef::Single(token) => Some(token),
        JoinRef::Composite(_) => None,
    }
}

fn table_of<R: ModelRegistry + ?Sized>(model_or_table: &str, registry: &R) -> String {
    registry
        .lookup_model(model_or_table)
        .map(|m| m.table_name.clone())
        .unwrap_or_else(|| model_or_table.to_string())
}

/// Foreign key column implied by a relation whose `from` key is an undeclared
/// property of `model`.
fn foreign_key<R: ModelRegistry + ?Sized>(
    model: &ModelDescriptor,
    relation: &RelationDescriptor,
    registry: &R,
    names: &Names,
) -> Option<(String, String)> {
    let (from_model, from_property) = split_reference(single_token(&relation.join.from)?)?;
    let (to_model, to_property) = split_reference(single_token(&relation.join.to)?)?;
    if from_model != model.name
        || model.id_properties.iter().any(|id| id == from_property)
        || model.properties.contains_key(from_property)
    {
        return None;
    }
    let definition = format!(
        "{} INTEGER REFERENCES {} ({})",
        quote(&names.db(from_property)),
        quote(&names.db(&table_of(to_model, registry))),
        quote(&names.db(to_property))
    );
    Some((from_property.to_string(), definition))
}

/// CREATE TABLE for one model.
pub fn create_migration<R: ModelRegistry + ?Sized>(
    model: &ModelDescriptor,
    registry: &R,
    settings: &Settings,
    now: NaiveDateTime,
) -> Result<Migration, ConfigError> {
    let names = Names {
        normalize: settings.normalize_db_names,
    };
    let table = names.db(&model.table_name);
    let schema_error = |source| ConfigError::Schema {
        model: model.name.clone(),
        source,
    };

    let mut columns = Vec::new();
    let composite_key = model.id_properties.len() > 1;
    if !composite_key {
        if let Some(id) = model.id_properties.first() {
            columns.push(format!("{} SERIAL PRIMARY KEY", quote(&names.db(id))));
        }
    } else {
        for id in &model.id_properties {
            let schema = match model.properties.get(id) {
                Some(schema) => expand(schema).map_err(schema_error)?,
                None => Value::Null,
            };
            let ty = if schema.is_null() { "INTEGER" } else { column_type(&schema) };
            columns.push(format!("{} {} NOT NULL", quote(&names.db(id)), ty));
        }
    }

    let mut foreign_keys = HashSet::new();
    for relation in model.relations.values() {
        if let Some((property, definition)) = foreign_key(model, relation, registry, &names) {
            if foreign_keys.insert(property) {
                columns.push(definition);
            }
        }
    }

    for (name, schema) in &model.properties {
        if model.id_properties.contains(name) {
            continue;
        }
        let schema = expand(schema).map_err(schema_error)?;
        if schema.get("computed") == Some(&Value::Bool(true)) {
            continue;
        }
        let mut definition = format!("{} {}", quote(&names.db(name)), column_type(&schema));
        if schema.get("required") == Some(&Value::Bool(true)) {
            definition.push_str(" NOT NULL");
        }
        if schema.get("unique") == Some(&Value::Bool(true)) {
            definition.push_str(" UNIQUE");
        }
        if let Some(default) = schema.get("default").and_then(default_sql) {
            definition.push_str(" DEFAULT ");
            definition.push_str(&default);
        }
        columns.push(definition);
    }

    if composite_key {
        let keys: Vec<String> = model.id_properties.iter().map(|id| quote(&names.db(id))).collect();
        columns.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    tracing::debug!(model = %model.name, table = %table, columns = columns.len(), "rendered migration");
    Ok(Migration {
        file_name: migration_file_name(&table, now),
        up: format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote(&table),
            columns.join(",\n  ")
        ),
        down: format!("DROP TABLE IF EXISTS {}", quote(&table)),
        table,
    })
}

/// Join table of an auto-generated or raw through relation. `None` when the
/// through table is a registered model, which gets its own migration.
pub fn create_through_migration<R: ModelRegistry + ?Sized>(
    relation: &RelationDescriptor,
    registry: &R,
    settings: &Settings,
    now: NaiveDateTime,
) -> Option<Migration> {
    let through = relation.join.through.as_ref()?;
    if through.model.is_some() || registry.contains_model(&through.table) {
        return None;
    }
    let names = Names {
        normalize: settings.normalize_db_names,
    };
    let table = names.db(&through.table);
    let mut columns = Vec::new();
    let mut keys = Vec::new();
    for (through_ref, target_ref) in [(&through.from, &relation.join.from), (&through.to, &relation.join.to)] {
        for (column, target) in through_ref.tokens().into_iter().zip(target_ref.tokens()) {
            let (_, column) = split_reference(column)?;
            let (target_model, target_property) = split_reference(target)?;
            let column = quote(&names.db(column));
            columns.push(format!(
                "{} INTEGER NOT NULL REFERENCES {} ({}) ON DELETE CASCADE",
                column,
                quote(&names.db(&table_of(target_model, registry))),
                quote(&names.db(target_property))
            ));
            keys.push(column);
        }
    }
    columns.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    Some(Migration {
        file_name: migration_file_name(&table, now),
        up: format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote(&table),
            columns.join(",\n  ")
        ),
        down: format!("DROP TABLE IF EXISTS {}", quote(&table)),
        table,
    })
}

/// Migrations for every model in dependency order, then one per distinct join table.
pub fn render_migrations(
    models: &ResolvedModels,
    settings: &Settings,
    now: NaiveDateTime,
) -> Result<Vec<Migration>, ConfigError> {
    let mut migrations = Vec::with_capacity(models.models.len());
    let mut tables = HashSet::new();
    for model in &models.models {
        let migration = create_migration(model, models, settings, now)?;
        tables.insert(migration.table.clone());
        migrations.push(migration);
    }
    for model in &models.models {
        for relation in model.relations.values() {
            if let Some(migration) = create_through_migration(relation, models, settings, now) {
                if tables.insert(migration.table.clone()) {
                    migrations.push(migration);
                }
            }
        }
    }
    tracing::info!(migrations = migrations.len(), "rendered migrations");
    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{from_json_str, resolve};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(8, 5, 7))
            .unwrap()
    }

    fn models(settings: &Settings) -> ResolvedModels {
        let config = from_json_str(
            r#"[
                {
                    "name": "User",
                    "tableName": "users",
                    "timestamps": true,
                    "properties": {
                        "email": { "type": "string", "required": true, "unique": true },
                        "score": { "type": "number", "default": 0 },
                        "fullName": { "type": "string", "computed": true }
                    },
                    "relations": {
                        "roles": { "relation": "manyToMany", "from": "User.id", "to": "Role.id" }
                    }
                },
                {
                    "name": "Role",
                    "properties": { "label": "string" },
                    "relations": {
                        "owner": { "relation": "belongsTo", "from": "Role.ownerId", "to": "User.id" }
                    }
                }
            ]"#,
        )
        .unwrap();
        resolve(&config, settings).unwrap()
    }

    #[test]
    fn names_files_by_timestamp() {
        assert_eq!(migration_file_name("users", now()), "20240309080507_users.sql");
    }

    #[test]
    fn renders_model_tables() {
        let settings = Settings::default();
        let migrations = render_migrations(&models(&settings), &settings, now()).unwrap();
        let tables: Vec<_> = migrations.iter().map(|m| m.table.as_str()).collect();
        assert_eq!(tables, vec!["users", "Role", "UserRole"]);
        assert_eq!(
            migrations[0].up,
            "CREATE TABLE IF NOT EXISTS \"users\" (\n  \
             \"id\" SERIAL PRIMARY KEY,\n  \
             \"email\" TEXT NOT NULL UNIQUE,\n  \
             \"score\" DOUBLE PRECISION DEFAULT 0,\n  \
             \"createdAt\" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,\n  \
             \"updatedAt\" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP\n)"
        );
        assert!(migrations[1]
            .up
            .contains("\"ownerId\" INTEGER REFERENCES \"users\" (\"id\")"));
        assert!(migrations[2].up.contains("PRIMARY KEY (\"userId\", \"roleId\")"));
        assert_eq!(migrations[2].down, "DROP TABLE IF EXISTS \"UserRole\"");
    }

    #[test]
    fn normalizes_names() {
        let settings = Settings {
            normalize_db_names: true,
            ..Default::default()
        };
        let migrations = render_migrations(&models(&settings), &settings, now()).unwrap();
        assert_eq!(migrations[2].table, "user_role");
        assert!(migrations[0].up.contains("\"created_at\" TIMESTAMPTZ"));
        assert!(migrations[2].up.contains("\"role_id\" INTEGER NOT NULL REFERENCES \"role\" (\"id\")"));
    }
}
