//! Handles settings for the application. Configuration is read from
//! `settings.toml` (optional) and from `COINSTORE__*` environment variables,
//! e.g. `COINSTORE__LEDGER__STARTING_GRANT=500`.
//!
//! See `settings.toml` at the repository root for an example.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// Tracing level applied to the workspace crates.
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    pub starting_grant: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Option<Database>,
    pub ledger: Ledger,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name(path).required(false))
                .add_source(Environment::with_prefix("COINSTORE").separator("__")),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("app.level", "info")?
            .set_default("ledger.starting_grant", engine::DEFAULT_STARTING_GRANT)?
            .build()?
            .try_deserialize()
    }

    /// Connection string of the configured database.
    pub fn database_url(&self) -> String {
        match &self.database {
            Some(Database::Memory) => String::from("sqlite::memory:"),
            Some(Database::Sqlite(path)) => format!("sqlite:{path}?mode=rwc"),
            None => String::from("sqlite:./coinstore.db?mode=rwc"),
        }
    }
}
