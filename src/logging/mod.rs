//! Logging pipeline for daylog
//!
//! Routes records into two daily-rotated streams under one directory: a
//! combined stream for INFO and above and an error stream for ERROR and
//! above. Lines are stamped in UTC.

mod bridge;
mod clock;
mod error;
mod formatter;
mod level;
mod logger;
mod retention;
mod sink;

pub use bridge::{install as install_tracing, PipelineLayer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{categorize_io_error, DeliveryError, DiskErrorKind, SinkOp, SinkWriteError};
pub use formatter::{format_timestamp, Formatter, LevelWord};
pub use level::{LogRecord, ParseSeverityError, Severity};
pub use logger::{global, initialize, Logger};
pub use retention::{prune_rotated, rotated_path, scan_rotated, DEFAULT_RETAIN_COUNT};
pub use sink::{Boundary, RotatingSink, RotationPolicy, SinkConfig};
