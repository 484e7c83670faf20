//! JSONL cycle log: append-only line-delimited JSON, one object per event.
//!
//! Each line is assembled in memory and written with a single `write_all` so a
//! reader tailing the file never sees a partial line.
//!
//! A write failure moves the writer from the primary path to the fallback path,
//! and from there to silent discard. Nothing ever goes to stderr, which is the
//! pager's terminal while a session runs.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::LogConfig;
use crate::core::errors::{FollowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionStart,
    CycleComplete,
    CycleFailed,
    SessionStop,
}

/// A single JSONL log entry. All fields optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Command as shown in the title bar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Refresh interval in seconds (session start).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<f64>,
    /// Spawn to publish, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Bytes collected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Bytes read and dropped after the buffer stopped growing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded_bytes: Option<u64>,
    /// Lines indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<u64>,
    /// Child exit code; absent when killed by a signal or never spawned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// `FLW-xxxx` code when the cycle failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of cycles run (session stop).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles: Option<u64>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: now_rfc3339(),
            event,
            severity,
            command: None,
            interval_secs: None,
            duration_ms: None,
            bytes: None,
            discarded_bytes: None,
            lines: None,
            exit_code: None,
            ok: None,
            error_code: None,
            error_message: None,
            cycles: None,
        }
    }

    /// Attach the code and message of a failure.
    #[must_use]
    pub fn with_error(mut self, error: &FollowError) -> Self {
        self.ok = Some(false);
        self.error_code = Some(error.code().to_string());
        self.error_message = Some(error.to_string());
        self
    }
}

/// Where entries currently go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Primary,
    Fallback,
    Discard,
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// A file is rotated before a line would push it past this size.
    pub max_size_bytes: u64,
    /// Rotated generations kept (`.1` is the newest).
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    /// Writer settings for the `[log]` section, or `None` when logging is off.
    #[must_use]
    pub fn from_log_config(log: &LogConfig) -> Option<Self> {
        log.is_enabled().then(|| Self {
            path: log.jsonl_path.clone(),
            fallback_path: log.fallback_path.clone(),
            max_size_bytes: log.max_size_bytes,
            max_rotated_files: log.max_rotated_files,
        })
    }

    fn path_for(&self, target: LogTarget) -> Option<&Path> {
        match target {
            LogTarget::Primary => Some(&self.path),
            LogTarget::Fallback => self.fallback_path.as_deref(),
            LogTarget::Discard => None,
        }
    }
}

/// Open log file and the number of bytes it already holds.
#[derive(Debug)]
struct Sink {
    target: LogTarget,
    file: BufWriter<File>,
    size: u64,
}

/// Append-only JSONL writer with rotation and fallback.
///
/// Failures never surface to the caller: each one moves the writer one step
/// down the chain, and once it reaches [`LogTarget::Discard`] it stays there.
#[derive(Debug)]
pub struct JsonlWriter {
    config: Option<JsonlConfig>,
    sink: Option<Sink>,
}

impl JsonlWriter {
    /// Open the log file, falling through the chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config: Some(config),
            sink: None,
        };
        writer.open_from(LogTarget::Primary);
        writer
    }

    /// Writer that drops everything (logging not configured).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            config: None,
            sink: None,
        }
    }

    /// Write a single entry as one line and flush it.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        if self.sink.is_none() {
            return;
        }
        // A plain struct of strings and numbers always serializes.
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');
        self.append(line.as_bytes());
    }

    pub fn flush(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.file.flush();
        }
    }

    #[must_use]
    pub fn target(&self) -> LogTarget {
        self.sink.as_ref().map_or(LogTarget::Discard, |s| s.target)
    }

    /// Size of the file currently written to.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.sink.as_ref().map_or(0, |s| s.size)
    }

    fn append(&mut self, line: &[u8]) {
        let len = line.len() as u64;
        let limit = self.config.as_ref().map_or(u64::MAX, |c| c.max_size_bytes);
        if self.sink.as_ref().is_some_and(|s| s.size > 0 && s.size + len > limit) {
            self.rotate();
        }

        while let Some(sink) = self.sink.as_mut() {
            let result = sink.file.write_all(line).and_then(|()| sink.file.flush());
            if result.is_ok() {
                sink.size += len;
                return;
            }
            let failed = sink.target;
            self.sink = None;
            self.open_from(next_target(failed));
        }
    }

    /// Open the first usable file starting at `target`.
    fn open_from(&mut self, mut target: LogTarget) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        while target != LogTarget::Discard {
            if let Some(Ok((file, size))) = config.path_for(target).map(open_append) {
                self.sink = Some(Sink {
                    target,
                    file: BufWriter::new(file),
                    size,
                });
                return;
            }
            target = next_target(target);
        }
        self.sink = None;
    }

    /// Shift `.1 .. .N-1` up by one, drop `.N`, move the live file to `.1` and
    /// start a fresh one at the same level.
    fn rotate(&mut self) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        let _ = sink.file.flush();
        drop(sink.file);

        let Some(config) = self.config.as_ref() else {
            return;
        };
        let Some(base) = config.path_for(sink.target).map(Path::to_path_buf) else {
            return;
        };
        let keep = config.max_rotated_files;
        let _ = fs::remove_file(rotated_name(&base, keep));
        for generation in (1..keep).rev() {
            let _ = rename(rotated_name(&base, generation), rotated_name(&base, generation + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                self.sink = Some(Sink {
                    target: sink.target,
                    file: BufWriter::new(file),
                    size: 0,
                });
            }
            Err(_) => self.open_from(next_target(sink.target)),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

const fn next_target(target: LogTarget) -> LogTarget {
    match target {
        LogTarget::Primary => LogTarget::Fallback,
        LogTarget::Fallback | LogTarget::Discard => LogTarget::Discard,
    }
}

/// Create parent directories, then open `path` for appending.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FollowError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| FollowError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

/// `follow.jsonl` → `follow.jsonl.2`.
fn rotated_name(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
