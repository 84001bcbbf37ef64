use config::ConfigError;

use crate::auth::TokenEngine;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// DEBUG | INFO | WARNING | ERROR
    pub log_level: String,
    pub storage: StorageBackend,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!("{}/{}", self.connection_string_without_db(), self.database_name)
    }

    /// Server-level URL, for creating databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    /// Configured key; the signing secret is derived from it and never exposed
    pub secret_key: String,
}

impl JwtSettings {
    pub fn engine(&self) -> Result<TokenEngine, ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret_key must not be empty".to_string()));
        }
        Ok(TokenEngine::from_key(&self.secret_key))
    }
}

/// Load `configuration.{yaml,toml,json}` (optional) overlaid with
/// `APP__SECTION__KEY` environment variables.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("application.log_level", "INFO")?
        .set_default("application.storage", "postgres")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.max_connections", 5)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
