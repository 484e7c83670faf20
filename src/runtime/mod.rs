//! Session runtime: refresh cadence, cycle lifecycle, signals and the event loop.

pub mod cycle;
pub mod event_loop;
pub mod schedule;
pub mod signals;

pub use event_loop::{EventLoop, ExitReason, LoopSettings};
