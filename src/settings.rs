//! Application settings read from a [`ConfigSource`]
//!
//! A missing or malformed setting is never fatal here: it is written to the
//! error stream and the getter returns `None`.

use crate::config::ConfigSource;
use crate::logging::Logger;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const MONGODB_URI: &str = "MONGODB_URI";
pub const MONGODB_DB_NAME: &str = "MONGODB_DB_NAME";
pub const DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub const FLASK_PORT: &str = "FLASK_PORT";

/// Why a setting could not be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Please set the environment variable {key} to use {service}.")]
    Missing { key: &'static str, service: &'static str },
    #[error("Environment variable {key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// MongoDB connection details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCreds {
    pub uri: String,
    pub db_name: String,
}

/// Every setting the process uses, each `None` if unavailable
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub openai_key: Option<String>,
    pub db: Option<DbCreds>,
    pub discord_token: Option<String>,
    pub flask_port: Option<u16>,
}

impl Settings {
    /// Read all settings, logging each one that is missing or invalid
    pub fn resolve(source: &dyn ConfigSource, logger: &Logger) -> Self {
        Self {
            openai_key: openai_key(source, logger),
            db: db_creds(source, logger),
            discord_token: discord_token(source, logger),
            flask_port: flask_port(source, logger),
        }
    }
}

/// Look up `key`, treating an empty value as absent
pub fn lookup(
    source: &dyn ConfigSource,
    key: &'static str,
    service: &'static str,
) -> Result<String, ConfigError> {
    match source.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { key, service }),
    }
}

fn required(
    source: &dyn ConfigSource,
    logger: &Logger,
    key: &'static str,
    service: &'static str,
) -> Option<String> {
    lookup(source, key, service)
        .map_err(|e| logger.error(e.to_string()))
        .ok()
}

pub fn openai_key(source: &dyn ConfigSource, logger: &Logger) -> Option<String> {
    required(source, logger, OPENAI_API_KEY, "the OpenAI API")
}

/// MongoDB URI and database name; both must be present
pub fn db_creds(source: &dyn ConfigSource, logger: &Logger) -> Option<DbCreds> {
    let uri = required(source, logger, MONGODB_URI, "MongoDB");
    let db_name = required(source, logger, MONGODB_DB_NAME, "MongoDB");
    Some(DbCreds {
        uri: uri?,
        db_name: db_name?,
    })
}

pub fn discord_token(source: &dyn ConfigSource, logger: &Logger) -> Option<String> {
    required(source, logger, DISCORD_TOKEN, "the Discord API")
}

/// Port for the HTTP server
pub fn flask_port(source: &dyn ConfigSource, logger: &Logger) -> Option<u16> {
    let raw = required(source, logger, FLASK_PORT, "the web server")?;
    match raw.trim().parse() {
        Ok(port) => Some(port),
        Err(_) => {
            logger.error(
                ConfigError::Invalid {
                    key: FLASK_PORT,
                    value: raw,
                }
                .to_string(),
            );
            None
        }
    }
}
