//! One refresh cycle: spawn, collect, reap, decode, publish.

#![allow(missing_docs)]

use std::io;
use std::os::fd::BorrowedFd;
use std::time::{Duration, Instant};

use crate::core::errors::FollowError;
use crate::pager::index::{LineIndex, TextIndexer};
use crate::process::accumulator::{DrainOutcome, OutputBuffer};
use crate::process::runner::{self, ChildProcess, CommandSpec};

/// Title bar text, captured when a cycle starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Titles {
    pub left: String,
    pub right: String,
}

impl Titles {
    /// Hostname and command on the left, local time on the right.
    #[must_use]
    pub fn capture(command: &CommandSpec) -> Self {
        let hostname = nix::unistd::gethostname()
            .ok()
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            left: left_title(hostname.as_deref(), command.display()),
            right: chrono::Local::now().format("%c").to_string(),
        }
    }
}

/// `"<hostname>: <command>"`, or just the command without a hostname.
#[must_use]
pub fn left_title(hostname: Option<&str>, command: &str) -> String {
    match hostname.filter(|h| !h.is_empty()) {
        Some(host) => format!("{host}: {command}"),
        None => command.to_string(),
    }
}

/// Counters recorded for the cycle log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleStats {
    pub bytes: usize,
    pub discarded: usize,
    pub duration: Duration,
    /// `None` when the child was killed by a signal or never ran.
    pub exit_code: Option<i32>,
}

/// Outcome of one cycle. Published whole and never mutated afterwards.
#[derive(Debug)]
pub struct CycleResult {
    pub titles: Titles,
    /// Output lines, or the error message when the cycle failed.
    pub index: LineIndex,
    pub error: Option<FollowError>,
    pub stats: CycleStats,
}

impl CycleResult {
    fn succeeded(titles: Titles, index: LineIndex, stats: CycleStats) -> Self {
        Self {
            titles,
            index,
            error: None,
            stats,
        }
    }

    /// Result that shows `error` in place of output.
    #[must_use]
    pub fn failed(titles: Titles, error: FollowError, stats: CycleStats) -> Self {
        let index = TextIndexer::default()
            .index(error.to_string().as_bytes())
            .unwrap_or_default();
        Self {
            titles,
            index,
            error: Some(error),
            stats,
        }
    }

    /// Result for a stream that broke off: whatever arrived is shown, followed
    /// by the error message on its own line. Falls back to the message alone
    /// when the partial output does not decode.
    #[must_use]
    pub fn interrupted(
        titles: Titles,
        partial: &[u8],
        error: FollowError,
        stats: CycleStats,
        indexer: &TextIndexer,
    ) -> Self {
        let mut text = partial.to_vec();
        if !text.is_empty() && !text.ends_with(b"\n") {
            text.push(b'\n');
        }
        text.extend_from_slice(error.to_string().as_bytes());
        match indexer.index(&text) {
            Ok(index) => Self {
                titles,
                index,
                error: Some(error),
                stats,
            },
            Err(_) => Self::failed(titles, error, stats),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A cycle whose child is still producing output.
#[derive(Debug)]
pub struct RunningCycle {
    child: ChildProcess,
    buffer: OutputBuffer,
    titles: Titles,
    started: Instant,
    read_error: Option<io::Error>,
}

impl RunningCycle {
    /// Spawn `command`. On failure the caller gets the titles back inside a
    /// ready-made error result.
    pub fn start(
        command: &CommandSpec,
        byte_limit: Option<usize>,
        titles: Titles,
        started: Instant,
    ) -> std::result::Result<Self, CycleResult> {
        match runner::spawn(command) {
            Ok(child) => Ok(Self {
                child,
                buffer: OutputBuffer::with_limit(byte_limit),
                titles,
                started,
                read_error: None,
            }),
            Err(error) => Err(CycleResult::failed(
                titles,
                error,
                CycleStats {
                    duration: started.elapsed(),
                    ..CycleStats::default()
                },
            )),
        }
    }

    #[must_use]
    pub fn output_fd(&self) -> Option<BorrowedFd<'_>> {
        self.child.output_fd()
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Read once. Returns `true` when the stream is done and the cycle can be
    /// finished.
    pub fn pump(&mut self) -> bool {
        match self.child.drain(&mut self.buffer) {
            DrainOutcome::Pending => false,
            DrainOutcome::Finished => true,
            DrainOutcome::Error(e) => {
                self.read_error = Some(e);
                true
            }
        }
    }

    /// Reap the child and decode what it wrote.
    pub fn finish(self, indexer: &TextIndexer) -> CycleResult {
        let Self {
            child,
            buffer,
            titles,
            started,
            read_error,
        } = self;

        // `wait` only fails if the child was already reaped, which ownership
        // rules out; treat it like a signal death.
        let exit_code = child.reap().ok().and_then(|status| status.code());
        let stats = CycleStats {
            bytes: buffer.len(),
            discarded: buffer.discarded(),
            duration: started.elapsed(),
            exit_code,
        };

        if let Some(source) = read_error {
            let error = FollowError::Read { source };
            return CycleResult::interrupted(titles, buffer.as_bytes(), error, stats, indexer);
        }
        if buffer.is_exhausted() {
            let error = FollowError::Allocation {
                collected: buffer.len(),
            };
            return CycleResult::failed(titles, error, stats);
        }
        match indexer.index(buffer.as_bytes()) {
            Ok(index) => CycleResult::succeeded(titles, index, stats),
            Err(error) => CycleResult::failed(titles, error, stats),
        }
    }

    /// Stop collecting. With `kill`, the child is killed and reaped; otherwise
    /// it is left running with its output pipe closed.
    pub fn abandon(self, kill: bool) {
        if kill {
            // Nothing useful can be done with a failed kill during shutdown.
            let _ = self.child.terminate();
        }
    }
}
