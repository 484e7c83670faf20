//! Incremental collection of a child's output.
//!
//! Each call to [`drain`] performs exactly one read. Capacity is reserved ahead
//! of need so at least one pipe buffer of headroom is always available; when
//! growth fails (allocation failure or the configured byte ceiling) the buffer
//! switches to discard mode: what was collected stays intact, and later bytes
//! are still read so the child can run to completion, but they are dropped.

#![allow(missing_docs)]

use std::io::{self, Read};

/// Headroom reserved ahead of each read: one atomic pipe write.
pub const GROWTH_STEP: usize = libc::PIPE_BUF;

/// Result of one drain step.
#[derive(Debug)]
pub enum DrainOutcome {
    /// Nothing more available right now; wait for readiness again.
    Pending,
    /// End of stream.
    Finished,
    /// Non-interrupt read failure. Bytes collected so far are kept.
    Error(io::Error),
}

impl DrainOutcome {
    /// Whether the stream is done (finished or failed).
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Finished | Self::Error(_))
    }
}

/// Growable byte buffer for one collection cycle.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    limit: Option<usize>,
    exhausted: bool,
    discarded: usize,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that stops growing after `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Error flag: growth failed and the buffer is discard-only.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Bytes read and dropped while in discard mode.
    #[must_use]
    pub const fn discarded(&self) -> usize {
        self.discarded
    }

    /// Consume the buffer, keeping only the collected bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bytes the next read may append, or `None` in discard mode.
    fn headroom(&mut self) -> Option<usize> {
        if self.exhausted {
            return None;
        }
        let len = self.bytes.len();
        let room_to_limit = self.limit.map_or(usize::MAX, |limit| limit.saturating_sub(len));
        if room_to_limit == 0 {
            return None;
        }
        if self.bytes.capacity() - len < GROWTH_STEP && self.bytes.try_reserve(GROWTH_STEP).is_err() {
            self.exhausted = true;
            return None;
        }
        Some((self.bytes.capacity() - len).min(room_to_limit))
    }
}

/// Perform one non-blocking read from `source` into `buffer`.
///
/// `Interrupted` is retried; `WouldBlock` maps to [`DrainOutcome::Pending`].
pub fn drain<R: Read>(source: &mut R, buffer: &mut OutputBuffer) -> DrainOutcome {
    loop {
        match read_once(source, buffer) {
            Ok(0) => return DrainOutcome::Finished,
            Ok(_) => return DrainOutcome::Pending,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return DrainOutcome::Pending,
            Err(e) => return DrainOutcome::Error(e),
        }
    }
}

fn read_once<R: Read>(source: &mut R, buffer: &mut OutputBuffer) -> io::Result<usize> {
    let mut scratch = [0u8; GROWTH_STEP];
    match buffer.headroom() {
        Some(room) => {
            let window = room.min(GROWTH_STEP);
            let n = source.read(&mut scratch[..window])?;
            // `headroom` reserved at least one step, so this never reallocates.
            buffer.bytes.extend_from_slice(&scratch[..n]);
            Ok(n)
        }
        None => {
            let n = source.read(&mut scratch)?;
            if n > 0 {
                buffer.exhausted = true;
                buffer.discarded += n;
            }
            Ok(n)
        }
    }
}
