//! Daily-rotated file sink
//!
//! A sink appends formatted lines to its active file. The first write whose
//! UTC day is later than the day the active file was started renames that
//! file to `<base>.<YYYY-MM-DD>`, opens a fresh one, and prunes rotated files
//! beyond the retention count. Rotation is checked on write; there is no
//! timer.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use super::error::{SinkOp, SinkWriteError};
use super::formatter::Formatter;
use super::level::{LogRecord, Severity};
use super::retention::{prune_rotated, rotated_path, scan_rotated, DEFAULT_RETAIN_COUNT};

/// When a sink starts a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    /// At the first write on a new UTC day
    #[default]
    MidnightUtc,
}

/// Rotation and retention settings for a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub boundary: Boundary,
    /// Rotated files kept besides the active one
    pub retain_count: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            boundary: Boundary::MidnightUtc,
            retain_count: DEFAULT_RETAIN_COUNT,
        }
    }
}

/// Static configuration of one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Path of the active file; rotated files live next to it
    pub path: PathBuf,
    /// Minimum severity this sink records
    pub threshold: Severity,
    pub rotation: RotationPolicy,
    pub formatter: Formatter,
}

/// Mutable state of a sink, only touched under its lock
#[derive(Debug)]
struct RotationState {
    /// Open handle to the active file, opened lazily
    file: Option<File>,
    /// Instant the active file was started, if it exists yet
    started_at: Option<DateTime<Utc>>,
    /// Rotated files on disk, oldest first
    historical: Vec<PathBuf>,
}

/// A file destination with a severity threshold and daily rotation
#[derive(Debug)]
pub struct RotatingSink {
    config: SinkConfig,
    state: Mutex<RotationState>,
}

impl RotatingSink {
    /// Create a sink, picking up any files a previous process left behind
    ///
    /// No file is opened or created until the first write.
    pub fn open(config: SinkConfig) -> Result<Self, SinkWriteError> {
        let started_at = match fs::metadata(&config.path) {
            Ok(meta) => meta.modified().ok().map(DateTime::<Utc>::from),
            Err(_) => None,
        };
        let historical = scan_rotated(&config.path)
            .map_err(|e| SinkWriteError::new(SinkOp::Open, &config.path, e))?;

        Ok(Self {
            config,
            state: Mutex::new(RotationState {
                file: None,
                started_at,
                historical,
            }),
        })
    }

    /// Path of the active file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn threshold(&self) -> Severity {
        self.config.threshold
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Whether a record of this severity belongs in this sink
    pub fn accepts(&self, severity: Severity) -> bool {
        severity >= self.config.threshold
    }

    /// Rotated files currently tracked, oldest first
    pub fn historical_files(&self) -> Vec<PathBuf> {
        self.lock_state().historical.clone()
    }

    /// Format a record with this sink's formatter and append it
    ///
    /// Records below the threshold are ignored.
    pub fn deliver(&self, record: &LogRecord) -> Result<(), SinkWriteError> {
        if !self.accepts(record.severity) {
            return Ok(());
        }
        let line = self.config.formatter.format(record);
        self.write(record.timestamp, &line)
    }

    /// Append `line` and a line terminator, rotating first if `at` falls on a
    /// later UTC day than the active file was started
    ///
    /// A line dated on an earlier day whose rotated file is still kept goes
    /// to that file instead. Retention runs after the line is written, so a
    /// file that cannot be pruned never costs a line; the prune failure is
    /// still returned.
    pub fn write(&self, at: DateTime<Utc>, line: &str) -> Result<(), SinkWriteError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        if let Some(target) = self.late_target(state, at) {
            return append_to(&target, buf.as_bytes());
        }

        let mut rotated = false;
        if let Some(started_at) = state.started_at {
            if self.crosses_boundary(started_at, at) {
                self.rotate(state, started_at.date_naive())?;
                rotated = true;
            }
        }

        let file = match &mut state.file {
            Some(file) => file,
            slot => slot.insert(self.open_active()?),
        };
        state.started_at.get_or_insert(at);

        file.write_all(buf.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| SinkWriteError::new(SinkOp::Write, &self.config.path, e))?;

        if rotated {
            prune_rotated(&mut state.historical, self.config.rotation.retain_count)
                .map_err(|(path, e)| SinkWriteError::new(SinkOp::Prune, path, e))?;
        }
        Ok(())
    }

    fn crosses_boundary(&self, started_at: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        match self.config.rotation.boundary {
            Boundary::MidnightUtc => at.date_naive() > started_at.date_naive(),
        }
    }

    /// Rotated file for a line stamped before the active file's day
    ///
    /// Only files still kept qualify; otherwise (clock stepped back past
    /// retention, or no file for that day) the line goes to the active file.
    fn late_target(&self, state: &RotationState, at: DateTime<Utc>) -> Option<PathBuf> {
        let started_at = state.started_at?;
        if at.date_naive() >= started_at.date_naive() {
            return None;
        }
        let target = rotated_path(&self.config.path, at.date_naive());
        state.historical.contains(&target).then_some(target)
    }

    /// Rename the active file after the day it was started
    fn rotate(
        &self,
        state: &mut RotationState,
        started_on: NaiveDate,
    ) -> Result<(), SinkWriteError> {
        let active = &self.config.path;
        state.file = None;

        if active.exists() {
            let target = rotated_path(active, started_on);
            if target.exists() {
                fs::remove_file(&target)
                    .map_err(|e| SinkWriteError::new(SinkOp::Rotate, &target, e))?;
            }
            fs::rename(active, &target)
                .map_err(|e| SinkWriteError::new(SinkOp::Rotate, active, e))?;

            state.historical.retain(|p| p != &target);
            state.historical.push(target);
        }
        state.started_at = None;
        Ok(())
    }

    fn open_active(&self) -> Result<File, SinkWriteError> {
        let path = &self.config.path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| SinkWriteError::new(SinkOp::Open, dir, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkWriteError::new(SinkOp::Open, path, e))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RotationState> {
        // A panic mid-write leaves the state usable; the file is the truth
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Append to a file without keeping it open
fn append_to(path: &Path, bytes: &[u8]) -> Result<(), SinkWriteError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(bytes))
        .map_err(|e| SinkWriteError::new(SinkOp::Write, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn sink_at(dir: &Path, threshold: Severity, retain_count: usize) -> RotatingSink {
        RotatingSink::open(SinkConfig {
            path: dir.join("app.log"),
            threshold,
            rotation: RotationPolicy {
                boundary: Boundary::MidnightUtc,
                retain_count,
            },
            formatter: Formatter::default(),
        })
        .unwrap()
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let logs = temp_dir.path().join("nested").join("logs");
        let sink = sink_at(&logs, Severity::Info, 7);

        sink.write(day(1, 10), "first").unwrap();
        sink.write(day(1, 11), "second").unwrap();

        assert_eq!(read(&logs.join("app.log")), "first\nsecond\n");
    }

    #[test]
    fn test_deliver_respects_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Error, 7);

        let info = LogRecord::at(day(1, 0), Severity::Info, "ignored");
        let error = LogRecord::at(day(1, 0), Severity::Error, "kept");
        sink.deliver(&info).unwrap();
        sink.deliver(&error).unwrap();

        assert_eq!(
            read(sink.path()),
            "2024-01-01T00:00:00Z error: kept\n"
        );
    }

    #[test]
    fn test_rotates_on_next_day() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);

        sink.write(day(1, 23), "day one").unwrap();
        sink.write(day(2, 0), "day two").unwrap();

        let rotated = temp_dir.path().join("app.log.2024-01-01");
        assert_eq!(read(&rotated), "day one\n");
        assert_eq!(read(sink.path()), "day two\n");
        assert_eq!(sink.historical_files(), vec![rotated]);
    }

    #[test]
    fn test_no_rotation_within_day() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);

        sink.write(day(1, 0), "a").unwrap();
        sink.write(day(1, 23) + Duration::minutes(59), "b").unwrap();

        assert!(sink.historical_files().is_empty());
        assert_eq!(read(sink.path()), "a\nb\n");
    }

    #[test]
    fn test_idle_gap_rotates_once_on_next_write() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);

        sink.write(day(1, 12), "before").unwrap();
        sink.write(day(4, 9), "after").unwrap();

        assert_eq!(
            sink.historical_files(),
            vec![temp_dir.path().join("app.log.2024-01-01")]
        );
        assert_eq!(read(sink.path()), "after\n");
    }

    #[test]
    fn test_earlier_day_does_not_rotate() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);

        sink.write(day(2, 0), "now").unwrap();
        sink.write(day(1, 23), "skewed").unwrap();

        assert!(sink.historical_files().is_empty());
        assert_eq!(read(sink.path()), "now\nskewed\n");
    }

    #[test]
    fn test_late_line_goes_to_its_day() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);

        sink.write(day(1, 10), "day one").unwrap();
        sink.write(day(2, 0), "day two").unwrap();
        // Stamped before midnight but reached the lock after the rotation
        sink.write(day(1, 23) + Duration::seconds(3599), "late").unwrap();

        assert_eq!(
            read(&temp_dir.path().join("app.log.2024-01-01")),
            "day one\nlate\n"
        );
        assert_eq!(read(sink.path()), "day two\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_prune_failure_still_writes_line() {
        let temp_dir = TempDir::new().unwrap();
        let stuck = temp_dir.path().join("app.log.2023-12-30");
        fs::write(&stuck, "old\n").unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 1);

        // Make the oldest rotated entry impossible to delete as a file
        fs::remove_file(&stuck).unwrap();
        fs::create_dir(&stuck).unwrap();
        fs::write(stuck.join("inside"), "x").unwrap();

        sink.write(day(1, 0), "day one").unwrap();
        let err = sink.write(day(2, 0), "day two").unwrap_err();

        assert_eq!(err.op, SinkOp::Prune);
        assert_eq!(err.path, stuck);
        assert_eq!(read(&temp_dir.path().join("app.log.2024-01-01")), "day one\n");
        assert_eq!(read(sink.path()), "day two\n");

        // Later rotations keep delivering and still prune what they can
        let err = sink.write(day(3, 0), "day three").unwrap_err();
        assert_eq!(err.path, stuck);
        assert_eq!(read(sink.path()), "day three\n");
        assert!(!temp_dir.path().join("app.log.2024-01-01").exists());
        assert!(temp_dir.path().join("app.log.2024-01-02").exists());
    }

    #[test]
    fn test_retention_keeps_seven() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);

        for d in 1..=12 {
            sink.write(day(d, 12), &format!("day {}", d)).unwrap();
        }

        let historical = sink.historical_files();
        assert_eq!(historical.len(), 7);
        assert_eq!(historical[0], temp_dir.path().join("app.log.2024-01-05"));
        assert_eq!(historical[6], temp_dir.path().join("app.log.2024-01-11"));
        assert!(!temp_dir.path().join("app.log.2024-01-04").exists());
        assert_eq!(scan_rotated(sink.path()).unwrap().len(), 7);
        assert_eq!(read(sink.path()), "day 12\n");
    }

    #[test]
    fn test_retain_zero_deletes_rotated() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 0);

        sink.write(day(1, 0), "old").unwrap();
        sink.write(day(2, 0), "new").unwrap();

        assert!(scan_rotated(sink.path()).unwrap().is_empty());
        assert_eq!(read(sink.path()), "new\n");
    }

    #[test]
    fn test_reopen_picks_up_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("app.log.2023-12-30"), "x\n").unwrap();
        fs::write(temp_dir.path().join("app.log"), "stale\n").unwrap();

        let sink = sink_at(temp_dir.path(), Severity::Info, 7);
        assert_eq!(sink.historical_files().len(), 1);

        // The existing file was written "today" per its mtime, so a write far
        // in the future rotates it under today's date.
        let future = Utc::now() + Duration::days(3);
        sink.write(future, "fresh").unwrap();

        let today = Utc::now().date_naive();
        let rotated = rotated_path(sink.path(), today);
        assert_eq!(read(&rotated), "stale\n");
        assert_eq!(read(sink.path()), "fresh\n");
        assert_eq!(sink.historical_files().len(), 2);
    }

    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);
        let line = "x".repeat(512);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        sink.write(day(1, 0), &line).unwrap();
                    }
                });
            }
        });

        let content = read(sink.path());
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| *l == line));
    }

    #[test]
    fn test_concurrent_boundary_rotates_once() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_at(temp_dir.path(), Severity::Info, 7);
        sink.write(day(1, 0), "old").unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| sink.write(day(2, 0), "new").unwrap());
            }
        });

        assert_eq!(sink.historical_files().len(), 1);
        assert_eq!(read(&temp_dir.path().join("app.log.2024-01-01")), "old\n");
        assert_eq!(read(sink.path()).lines().count(), 8);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_error_when_directory_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("logs");
        fs::write(&blocker, "not a dir").unwrap();

        let sink = sink_at(&blocker, Severity::Info, 7);
        let err = sink.write(day(1, 0), "lost").unwrap_err();
        assert_eq!(err.op, SinkOp::Open);
    }
}
