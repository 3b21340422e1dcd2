//! Configuration for daylog
//!
//! Two sources feed the process: `logging.toml` describes the log pipeline,
//! and a key-value lookup (the process environment, with `.env` loaded)
//! supplies application settings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::{
    Boundary, Formatter, RotationPolicy, Severity, SinkConfig, DEFAULT_RETAIN_COUNT,
};

/// Default location of the logging config file, relative to the working directory
pub const LOGGING_CONFIG_FILE: &str = "logging.toml";

/// Active file of the stream that receives everything at or above INFO
pub const COMBINED_LOG_FILE: &str = "flask_combined.log";

/// Active file of the stream that receives only ERROR and above
pub const ERROR_LOG_FILE: &str = "flask_error.log";

/// How the level position of each line is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LevelWords {
    /// The record's own severity name
    #[default]
    Severity,
    /// `info` in the combined stream and `error` in the error stream, always
    Stream,
}

/// Log pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory holding both streams (default: "logs")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Records below this severity are dropped before reaching any sink (default: info)
    #[serde(default = "default_level")]
    pub level: Severity,

    /// Rotated files kept per stream (default: 7, one week)
    #[serde(default = "default_retain_count")]
    pub retain_count: usize,

    /// Level word mode: "severity" (default) or "stream" for fixed per-stream words
    #[serde(default)]
    pub level_words: LevelWords,

    /// Also print records to stderr (default: true)
    #[serde(default = "default_console")]
    pub console: bool,

    /// Filter directive for the stderr output; RUST_LOG takes precedence (default: "info")
    #[serde(default = "default_console_filter")]
    pub console_filter: String,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_level() -> Severity {
    Severity::Info
}

fn default_retain_count() -> usize {
    DEFAULT_RETAIN_COUNT
}

fn default_console() -> bool {
    true
}

fn default_console_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            level: default_level(),
            retain_count: default_retain_count(),
            level_words: LevelWords::default(),
            console: default_console(),
            console_filter: default_console_filter(),
        }
    }
}

impl LoggingConfig {
    /// Load configuration from file, or return default if not found
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read logging config")?;
            toml::from_str(&content).context("Failed to parse logging config")
        } else {
            Ok(Self::default())
        }
    }

    /// Default config rooted at another directory
    pub fn in_dir(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    /// The combined and error stream sinks, in dispatch order
    pub fn sinks(&self) -> Vec<SinkConfig> {
        let rotation = RotationPolicy {
            boundary: Boundary::MidnightUtc,
            retain_count: self.retain_count,
        };
        let formatter = |stream_word: &str| match self.level_words {
            LevelWords::Severity => Formatter::by_severity(),
            LevelWords::Stream => Formatter::fixed(stream_word),
        };

        vec![
            SinkConfig {
                path: self.log_dir.join(COMBINED_LOG_FILE),
                threshold: Severity::Info,
                rotation,
                formatter: formatter("info"),
            },
            SinkConfig {
                path: self.log_dir.join(ERROR_LOG_FILE),
                threshold: Severity::Error,
                rotation,
                formatter: formatter("error"),
            },
        ]
    }
}

/// A key-value lookup for application settings
pub trait ConfigSource {
    /// Value for `key`, or `None` if it is not set
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
///
/// Call [`load_dotenv`] first so values from a `.env` file are visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory source
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Load a `.env` file from the working directory or its parents, if any
///
/// Returns the path that was loaded. Variables already set in the
/// environment are not overridden.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
