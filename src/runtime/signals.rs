//! Terminating signals: SIGINT, SIGTERM and SIGHUP all request shutdown.
//!
//! Uses `signal-hook` flag registration; the handler only stores into an atomic
//! and the event loop checks it at the top of each iteration. A signal that
//! arrives during the readiness wait interrupts it, so the check happens
//! promptly.

#![allow(missing_docs)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

/// Shutdown flag shared between signal handlers and the event loop.
///
/// `Ordering::Relaxed` is enough: the flag carries no data and the loop polls it
/// every iteration.
#[derive(Clone, Debug, Default)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register the OS signal hooks.
    pub fn new() -> io::Result<Self> {
        let handler = Self::default();
        for signal in [SIGINT, SIGTERM, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(&handler.shutdown_flag))?;
        }
        Ok(handler)
    }

    /// Handler with no OS hooks; only [`request_shutdown`](Self::request_shutdown)
    /// sets it.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }
}
