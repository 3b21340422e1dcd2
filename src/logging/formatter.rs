//! Line formatting for log records
//!
//! Every line has the shape `<YYYY-MM-DDTHH:MM:SS>Z <level>: <message>`, with
//! the timestamp always rendered in UTC at second precision.

use chrono::{DateTime, Utc};

use super::level::LogRecord;

/// Timestamp layout, without the trailing `Z` marker
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Which word goes in the level position of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelWord {
    /// The record's own severity name (`info`, `warning`, `error`, ...)
    Severity,
    /// A fixed word per sink, regardless of the record's severity
    Fixed(String),
}

/// Renders records into single text lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    level_word: LevelWord,
}

impl Formatter {
    pub fn new(level_word: LevelWord) -> Self {
        Self { level_word }
    }

    /// Formatter that prints the record's own severity
    pub fn by_severity() -> Self {
        Self::new(LevelWord::Severity)
    }

    /// Formatter that prints the same word for every record
    pub fn fixed(word: impl Into<String>) -> Self {
        Self::new(LevelWord::Fixed(word.into()))
    }

    /// Render a record as a line, without a trailing line terminator
    ///
    /// The message is not escaped: embedded newlines pass through as-is.
    pub fn format(&self, record: &LogRecord) -> String {
        let word = match &self.level_word {
            LevelWord::Severity => record.severity.as_str(),
            LevelWord::Fixed(word) => word.as_str(),
        };
        format!(
            "{}Z {}: {}",
            format_timestamp(&record.timestamp),
            word,
            record.message
        )
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::by_severity()
    }
}

/// Render an instant as `YYYY-MM-DDTHH:MM:SS` in UTC
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}
