//! Errors raised while delivering lines to sinks

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Categories of disk errors for readable messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "I/O error",
        }
    }
}

/// Categorize an IO error
pub fn categorize_io_error(e: &io::Error) -> DiskErrorKind {
    use io::ErrorKind;

    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28; EDQUOT = 122 on Linux, 69 on macOS
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// What a sink was doing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOp {
    Open,
    Write,
    Rotate,
    Prune,
}

impl fmt::Display for SinkOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SinkOp::Open => "open",
            SinkOp::Write => "write",
            SinkOp::Rotate => "rotate",
            SinkOp::Prune => "prune",
        })
    }
}

/// A sink failed to persist a line
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} {}: {}", path.display(), kind.user_message())]
pub struct SinkWriteError {
    pub path: PathBuf,
    pub op: SinkOp,
    pub kind: DiskErrorKind,
    #[source]
    pub source: io::Error,
}

impl SinkWriteError {
    pub fn new(op: SinkOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            op,
            kind: categorize_io_error(&source),
            source,
        }
    }
}

/// One or more sinks failed for a single record
///
/// Sinks that did not fail still received the record.
#[derive(Debug, thiserror::Error)]
#[error("{} sink(s) failed{}", failures.len(), list_failures(failures))]
pub struct DeliveryError {
    pub failures: Vec<SinkWriteError>,
}

fn list_failures(failures: &[SinkWriteError]) -> String {
    failures.iter().map(|f| format!("; {}", f)).collect()
}
