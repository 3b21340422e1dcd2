//! daylog - daily-rotated, per-severity UTC log files
//!
//! This library provides the log pipeline and the settings lookup used by the
//! daylog binary.

pub mod config;
pub mod logging;
pub mod settings;
