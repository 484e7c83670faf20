//! Child process spawning for one refresh cycle.
//!
//! The child gets the null device on stdin and the write end of a single pipe on
//! both stdout and stderr, so the two streams arrive interleaved in the order the
//! child wrote them. The parent keeps only the read end, marked close-on-exec (a
//! later child never inherits it) and non-blocking (a read never stalls the event
//! loop).

#![allow(missing_docs)]

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};

use crate::core::errors::{FollowError, Result};
use crate::process::accumulator::{self, DrainOutcome, OutputBuffer};

/// Fully resolved command line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    display: String,
}

impl CommandSpec {
    /// Execute `args[0]` directly (resolved on `PATH`) with the remaining arguments.
    pub fn direct(args: Vec<String>) -> Result<Self> {
        if args.is_empty() {
            return Err(FollowError::InvalidConfig {
                details: "no command given".to_string(),
            });
        }
        let display = args.join(" ");
        Ok(Self {
            argv: args,
            display,
        })
    }

    /// Run the arguments joined by spaces through `shell -c`.
    pub fn shell(shell: &Path, args: &[String]) -> Result<Self> {
        if args.is_empty() {
            return Err(FollowError::InvalidConfig {
                details: "no command given".to_string(),
            });
        }
        let script = args.join(" ");
        Ok(Self {
            argv: vec![
                shell.to_string_lossy().into_owned(),
                "-c".to_string(),
                script.clone(),
            ],
            display: script,
        })
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Human-readable form used in the title bar and the log.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }
}

/// A running child and the read end of its output pipe.
///
/// Reaping consumes the value, so the pipe can never be read after the exit
/// status has been collected.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    output: Option<File>,
}

/// Spawn `spec` with merged output.
///
/// Any pipe end opened before a failure is closed on return (the descriptors are
/// owned values dropped with the error).
pub fn spawn(spec: &CommandSpec) -> Result<ChildProcess> {
    let spawn_error = |source: io::Error| FollowError::Spawn {
        command: spec.display().to_string(),
        source,
    };

    let (read_end, write_end) = nix::unistd::pipe().map_err(|errno| spawn_error(errno.into()))?;
    set_cloexec(&read_end).map_err(spawn_error)?;
    set_cloexec(&write_end).map_err(spawn_error)?;
    set_nonblocking(&read_end).map_err(spawn_error)?;
    let stderr_end = write_end.try_clone().map_err(spawn_error)?;

    let child = {
        let mut command = Command::new(spec.program());
        command
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(write_end))
            .stderr(Stdio::from(stderr_end));
        command.spawn().map_err(spawn_error)?
        // `command` drops here and closes the parent's copies of the write end;
        // otherwise the read end would never see end-of-stream.
    };

    Ok(ChildProcess {
        child,
        output: Some(File::from(read_end)),
    })
}

impl ChildProcess {
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Descriptor to wait on for readability; `None` once the stream is closed.
    #[must_use]
    pub fn output_fd(&self) -> Option<BorrowedFd<'_>> {
        self.output.as_ref().map(AsFd::as_fd)
    }

    /// Whether the output stream is still open.
    #[must_use]
    pub const fn is_collecting(&self) -> bool {
        self.output.is_some()
    }

    /// Run one drain step. The pipe is closed as soon as the outcome is final.
    pub fn drain(&mut self, buffer: &mut OutputBuffer) -> DrainOutcome {
        let Some(output) = self.output.as_mut() else {
            return DrainOutcome::Finished;
        };
        let outcome = accumulator::drain(output, buffer);
        if outcome.is_final() {
            self.output = None;
        }
        outcome
    }

    /// Collect the exit status. Blocks until the child exits; after
    /// end-of-stream that is imminent.
    pub fn reap(mut self) -> io::Result<ExitStatus> {
        self.output = None;
        self.child.wait()
    }

    /// Kill the child and collect its status.
    pub fn terminate(mut self) -> io::Result<ExitStatus> {
        self.output = None;
        // Fails only when the child has already been reaped, which cannot happen
        // before `wait` below.
        let _ = self.child.kill();
        self.child.wait()
    }
}

fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

fn set_nonblocking(fd: &OwnedFd) -> io::Result<()> {
    let bits = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(bits) | OFlag::O_NONBLOCK;
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags))?;
    Ok(())
}
