//! tracing integration
//!
//! Forwards `tracing` events into a [`Logger`] so `tracing::info!` and friends
//! land in the rotated log files, and optionally mirrors them to stderr.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

use super::level::Severity;
use super::logger::Logger;

/// A subscriber layer that hands every event to a [`Logger`]
///
/// Only the event's message is kept; other fields are dropped.
pub struct PipelineLayer {
    logger: Arc<Logger>,
}

impl PipelineLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for PipelineLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let severity = Severity::from(*event.metadata().level());
        if !self.logger.enabled(severity) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Err(e) = self.logger.emit(severity, visitor.message) {
            eprintln!("daylog: {}", e);
        }
    }
}

/// Pulls the `message` field out of an event
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        }
    }
}

/// Install the global tracing subscriber for `logger`
///
/// Fails if another global subscriber is already set.
pub fn install(logger: Arc<Logger>, config: &LoggingConfig) -> Result<()> {
    let console_layer = config.console.then(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.console_filter));
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(env_filter)
    });

    tracing_subscriber::registry()
        .with(PipelineLayer::new(logger))
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}
