//! Refresh cadence.
//!
//! Timer-driven refreshes advance the deadline by exactly one interval from the
//! previous deadline, so a slow command does not make the cadence drift. The
//! initial refresh and user-forced refreshes re-anchor at `now + interval`.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

/// Why the next cycle is being started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RefreshRequest {
    #[default]
    None,
    /// The deadline passed.
    Scheduled,
    /// Startup or the refresh key. Takes precedence over `Scheduled`.
    Forced,
}

impl RefreshRequest {
    /// Merge two requests, keeping the stronger one.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    #[must_use]
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshTimer {
    interval: Duration,
    deadline: Instant,
}

impl RefreshTimer {
    /// Timer whose first deadline is `now`; the loop starts with a forced
    /// refresh anyway.
    #[must_use]
    pub const fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            deadline: now,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Account for a cycle starting at `now` for the given reason.
    pub fn on_cycle_start(&mut self, request: RefreshRequest, now: Instant) {
        match request {
            RefreshRequest::Scheduled => self.deadline += self.interval,
            RefreshRequest::Forced | RefreshRequest::None => self.deadline = now + self.interval,
        }
    }

    /// Time left until the deadline; zero once it has passed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}
