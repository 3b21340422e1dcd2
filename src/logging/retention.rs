//! Rotated log file naming and retention
//!
//! A rotated file is named `<base>.<YYYY-MM-DD>` after the UTC day it was
//! started, so names sort chronologically. Retention keeps the newest
//! `retain_count` of them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Default number of rotated files kept per stream (one week)
pub const DEFAULT_RETAIN_COUNT: usize = 7;

const DATE_SUFFIX_FORMAT: &str = "%Y-%m-%d";

/// Path a file started on `day` is renamed to when it rotates
pub fn rotated_path(active: &Path, day: NaiveDate) -> PathBuf {
    let mut name = active
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}", day.format(DATE_SUFFIX_FORMAT)));
    active.with_file_name(name)
}

/// Parse the day out of a rotated file name, if it belongs to `base_name`
fn rotated_day(file_name: &str, base_name: &str) -> Option<NaiveDate> {
    let suffix = file_name.strip_prefix(base_name)?.strip_prefix('.')?;
    NaiveDate::parse_from_str(suffix, DATE_SUFFIX_FORMAT).ok()
}

/// List rotated files for `active` on disk, oldest first
///
/// A missing directory has no rotated files.
pub fn scan_rotated(active: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(base_name) = active.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = match active.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(day) = rotated_day(name, base_name) {
            found.push((day, active.with_file_name(name)));
        }
    }

    found.sort_by_key(|(day, _)| *day);
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Delete the oldest files in `historical` until at most `retain_count` remain
///
/// `historical` is ordered oldest first and is updated in place. Files that
/// are already gone count as deleted. A file that cannot be deleted stays
/// tracked and the rest are still tried; the first failure is returned with
/// the path that failed. Otherwise returns the paths that were removed.
pub fn prune_rotated(
    historical: &mut Vec<PathBuf>,
    retain_count: usize,
) -> Result<Vec<PathBuf>, (PathBuf, io::Error)> {
    let excess = historical.len().saturating_sub(retain_count);
    let mut removed = Vec::new();
    let mut first_failure = None;

    let mut kept = Vec::with_capacity(historical.len());
    for (index, path) in historical.drain(..).enumerate() {
        if index >= excess {
            kept.push(path);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => removed.push(path),
            Err(e) => {
                if first_failure.is_none() {
                    first_failure = Some((path.clone(), e));
                }
                kept.push(path);
            }
        }
    }
    *historical = kept;

    match first_failure {
        Some(failure) => Err(failure),
        None => Ok(removed),
    }
}
