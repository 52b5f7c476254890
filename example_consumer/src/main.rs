//! Example consumer: a separate Rust project that uses architect-models as a dependency.
//!
//! Run from repo root: `cargo run -p example-consumer -- <command>`
//!
//! Commands:
//! - `schemas` (default): print every compiled model schema
//! - `relations`: print every resolved relation
//! - `query <Model> <params-json>`: print the query plan for the parameters
//! - `migrations <dir>`: write CREATE TABLE migrations into `dir`

use architect_models::{
    load_from_path, render_migrations, resolve, translate_query, AllowedKeys, AppError, ErrorBody,
    QuerySpec, ResolvedModels, Settings,
};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("architect_models=info")),
        )
        .init();

    let models_path = std::env::var("MODELS_PATH").unwrap_or_else(|_| "models".into());
    let settings = Settings::from_env();
    let config = load_from_path(Path::new(&models_path))?;
    let models = resolve(&config, &settings)?;
    tracing::info!("Loaded {} models from {}", models.models.len(), models_path);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str).unwrap_or("schemas") {
        "schemas" => print_schemas(&models)?,
        "relations" => {
            for model in &models.models {
                for (name, relation) in &model.relations {
                    println!("{}.{}: {}", model.name, name, serde_json::to_string(relation)?);
                }
            }
        }
        "query" => {
            let model = args.get(1).ok_or("usage: query <Model> <params-json>")?;
            let params = args.get(2).map(String::as_str).unwrap_or("{}");
            print_query(&models, model, params)?;
        }
        "migrations" => {
            let dir = PathBuf::from(args.get(1).ok_or("usage: migrations <dir>")?);
            std::fs::create_dir_all(&dir)?;
            let now = chrono::Local::now().naive_local();
            for migration in render_migrations(&models, &settings, now)? {
                let file = dir.join(&migration.file_name);
                std::fs::write(&file, migration.contents())?;
                tracing::info!("Wrote {}", file.display());
            }
        }
        other => return Err(format!("unknown command: {}", other).into()),
    }
    Ok(())
}

fn print_schemas(models: &ResolvedModels) -> Result<(), Box<dyn std::error::Error>> {
    for name in models.names() {
        if let Some(schema) = models.schema(name) {
            println!("{}", serde_json::to_string_pretty(schema)?);
        }
    }
    Ok(())
}

fn print_query(models: &ResolvedModels, model: &str, params: &str) -> Result<(), Box<dyn std::error::Error>> {
    let params: serde_json::Map<String, serde_json::Value> = serde_json::from_str(params)?;
    match translate_query(&params, &AllowedKeys::all(), model, models) {
        Ok(plan) => {
            let mut spec = QuerySpec::default();
            plan.apply(&mut spec);
            println!("{}", serde_json::to_string_pretty(&plan)?);
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        Err(err) => {
            let err = AppError::from(err);
            println!("{} {}", err.status(), serde_json::to_string_pretty(&ErrorBody::from(&err))?);
        }
    }
    Ok(())
}
