//! Runtime settings read from the environment.

/// Settings for model resolution and migration rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Log each compiled model schema at `info`.
    pub log_schema: bool,
    /// Render table and column names in snake_case.
    pub normalize_db_names: bool,
}

impl Settings {
    /// Reads `ARCHITECT_LOG_SCHEMA` and `ARCHITECT_NORMALIZE_DB_NAMES` (`1`, `true`, `yes`, `on`).
    pub fn from_env() -> Self {
        Settings {
            log_schema: env_flag("ARCHITECT_LOG_SCHEMA"),
            normalize_db_names: env_flag("ARCHITECT_NORMALIZE_DB_NAMES"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
