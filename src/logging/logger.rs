//! The log pipeline entry point
//!
//! A [`Logger`] owns a severity floor and a set of rotating sinks. Each
//! emitted record is stamped once and offered to every sink whose threshold
//! it meets; a failing sink never keeps the record from the others.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{bail, Context, Result};

use crate::config::LoggingConfig;

use super::clock::{Clock, SystemClock};
use super::error::DeliveryError;
use super::level::{LogRecord, Severity};
use super::sink::{RotatingSink, SinkConfig};

/// Severity floor plus the sinks records are routed to
pub struct Logger {
    floor: Severity,
    sinks: Vec<RotatingSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("floor", &self.floor)
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Build the combined and error streams described by `config`
    pub fn new(config: &LoggingConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`Logger::new`], stamping records with `clock`
    pub fn with_clock(config: &LoggingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::from_sinks(config.level, config.sinks(), clock)
    }

    /// Build a logger from explicit sink configs
    ///
    /// Two sinks may not share a file.
    pub fn from_sinks(
        floor: Severity,
        sink_configs: Vec<SinkConfig>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut sinks = Vec::with_capacity(sink_configs.len());
        for sink_config in sink_configs {
            if !seen.insert(sink_config.path.clone()) {
                bail!(
                    "Log file {} is configured for more than one sink",
                    sink_config.path.display()
                );
            }
            let path = sink_config.path.clone();
            let sink = RotatingSink::open(sink_config)
                .with_context(|| format!("Failed to open log sink {}", path.display()))?;
            sinks.push(sink);
        }

        Ok(Self {
            floor,
            sinks,
            clock,
        })
    }

    /// Global severity floor
    pub fn floor(&self) -> Severity {
        self.floor
    }

    pub fn sinks(&self) -> &[RotatingSink] {
        &self.sinks
    }

    /// Whether a record at `severity` would reach at least one sink
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.floor && self.sinks.iter().any(|s| s.accepts(severity))
    }

    /// Stamp a record with the current time and dispatch it
    pub fn emit(
        &self,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<(), DeliveryError> {
        if severity < self.floor {
            return Ok(());
        }
        let record = LogRecord::at(self.clock.now(), severity, message);
        self.dispatch(&record)
    }

    /// Dispatch an already-stamped record
    pub fn log(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        if record.severity < self.floor {
            return Ok(());
        }
        self.dispatch(record)
    }

    fn dispatch(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let failures: Vec<_> = self
            .sinks
            .iter()
            .filter_map(|sink| sink.deliver(record).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeliveryError { failures })
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit_or_warn(Severity::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit_or_warn(Severity::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit_or_warn(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit_or_warn(Severity::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.emit_or_warn(Severity::Critical, message);
    }

    /// Emit, reporting delivery failures on stderr instead of returning them
    fn emit_or_warn(&self, severity: Severity, message: impl Into<String>) {
        if let Err(e) = self.emit(severity, message) {
            // Can't route this through the pipeline that just failed
            eprintln!("daylog: {}", e);
        }
    }
}

static LOGGER: OnceLock<Arc<Logger>> = OnceLock::new();

/// Serializes first-time initialization
static INIT: Mutex<()> = Mutex::new(());

/// Initialize the process-wide logger
///
/// The first successful call builds the logger from `config` and installs the
/// tracing bridge so `tracing` events reach the log files. Later calls return
/// the same logger and change nothing, so sinks are never attached twice; a
/// differing `config` is reported as a warning.
///
/// The logger is only published once the bridge is installed. If installing
/// fails (another global subscriber is set), nothing is published and every
/// later call fails the same way.
pub fn initialize(config: &LoggingConfig) -> Result<Arc<Logger>> {
    if let Some(logger) = LOGGER.get() {
        warn_if_reconfigured(logger, config);
        return Ok(Arc::clone(logger));
    }

    let _init = INIT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(logger) = LOGGER.get() {
        warn_if_reconfigured(logger, config);
        return Ok(Arc::clone(logger));
    }

    let logger = Arc::new(Logger::new(config)?);
    super::bridge::install(Arc::clone(&logger), config)?;
    Ok(Arc::clone(LOGGER.get_or_init(|| logger)))
}

/// The process-wide logger, if [`initialize`] has run
pub fn global() -> Option<Arc<Logger>> {
    LOGGER.get().cloned()
}

fn warn_if_reconfigured(logger: &Logger, config: &LoggingConfig) {
    let requested: Vec<_> = config.sinks();
    let current: Vec<_> = logger.sinks.iter().map(|s| s.config().clone()).collect();
    if logger.floor != config.level || requested != current {
        tracing::warn!("Logging is already initialized; ignoring new configuration");
    }
}
