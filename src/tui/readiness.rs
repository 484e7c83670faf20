//! The event loop's single suspension point: `poll(2)` over the keyboard and the
//! child's output pipe.

#![allow(missing_docs)]

use std::io;
use std::os::fd::BorrowedFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

use crate::core::errors::{FollowError, Result};

/// Which sources became ready. Both false means the timeout expired or the
/// wait was interrupted by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadySet {
    pub input: bool,
    pub output: bool,
}

impl ReadySet {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.input && !self.output
    }
}

/// Block until `input` or `output` is readable or `timeout` elapses.
///
/// `None` waits indefinitely. Timeouts beyond `u16::MAX` milliseconds are cut
/// short; the caller re-checks its deadline after every return anyway. Hang-up
/// and error conditions count as readable so the next read can observe them.
pub fn wait_ready(
    input: Option<BorrowedFd<'_>>,
    output: Option<BorrowedFd<'_>>,
    timeout: Option<Duration>,
) -> Result<ReadySet> {
    let mut fds = Vec::with_capacity(2);
    if let Some(fd) = input {
        fds.push(PollFd::new(fd, PollFlags::POLLIN));
    }
    if let Some(fd) = output {
        fds.push(PollFd::new(fd, PollFlags::POLLIN));
    }
    if fds.is_empty() && timeout.is_none() {
        return Ok(ReadySet::default());
    }

    match poll(&mut fds, poll_timeout(timeout)) {
        Ok(0) | Err(Errno::EINTR) => return Ok(ReadySet::default()),
        Ok(_) => {}
        Err(errno) => {
            return Err(FollowError::Terminal {
                source: io::Error::from(errno),
            });
        }
    }

    let readable = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
    let mut ready = fds
        .iter()
        .map(|fd| fd.revents().is_some_and(|r| r.intersects(readable)));
    let mut set = ReadySet::default();
    if input.is_some() {
        set.input = ready.next().unwrap_or(false);
    }
    if output.is_some() {
        set.output = ready.next().unwrap_or(false);
    }
    Ok(set)
}

fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    let Some(timeout) = timeout else {
        return PollTimeout::NONE;
    };
    // Round up so a sub-millisecond remainder does not turn into a busy spin.
    let mut millis = timeout.as_millis();
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    PollTimeout::from(u16::try_from(millis).unwrap_or(u16::MAX))
}
