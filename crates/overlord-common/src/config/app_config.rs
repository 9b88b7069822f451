//! Process configuration
//!
//! Loads the deployment settings (which guild, which database, where the bot
//! config lives) from environment variables.

use std::env;
use std::path::PathBuf;

use overlord_core::Snowflake;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub guild: GuildConfig,
    pub database: DatabaseConfig,
    /// Path of the TOML bot configuration
    pub bot_config_path: PathBuf,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// The single guild this deployment serves
#[derive(Debug, Clone, Copy)]
pub struct GuildConfig {
    pub guild_id: Snowflake,
    /// Channel where admin commands are accepted
    pub control_channel_id: Option<Snowflake>,
    /// Channel where warnings and errors are posted
    pub error_channel_id: Option<Snowflake>,
}

impl GuildConfig {
    /// Messages in the control or error channel are not counted as activity
    pub fn is_special_channel(&self, channel_id: Snowflake) -> bool {
        self.control_channel_id == Some(channel_id) || self.error_channel_id == Some(channel_id)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

// Default value functions
fn default_app_name() -> String {
    "overlord".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_bot_config_path() -> PathBuf {
    PathBuf::from("config/overlord.toml")
}

fn snowflake_var(name: &'static str) -> Result<Option<Snowflake>, ConfigError> {
    match env::var(name) {
        Ok(raw) => Snowflake::parse(&raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name, e.to_string())),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            guild: GuildConfig {
                guild_id: snowflake_var("GUILD_ID")?.ok_or(ConfigError::MissingVar("GUILD_ID"))?,
                control_channel_id: snowflake_var("CONTROL_CHANNEL_ID")?,
                error_channel_id: snowflake_var("ERROR_CHANNEL_ID")?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_connections),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_min_connections),
            },
            bot_config_path: env::var("BOT_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_bot_config_path()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Failed to read bot config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write bot config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse bot config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize bot config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid bot config at {path}: {reason}")]
    Invalid { path: String, reason: String },
}
