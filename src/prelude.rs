//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use follow::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, DecodeMode};
pub use crate::core::errors::{FollowError, Result};

// Process
pub use crate::process::accumulator::{DrainOutcome, OutputBuffer};
pub use crate::process::runner::{ChildProcess, CommandSpec, spawn};

// Pager
pub use crate::pager::index::{LineIndex, TextIndexer};
pub use crate::pager::keys::KeyAction;
pub use crate::pager::viewport::{Bounds, ScrollIntent, Viewport};

// Runtime
pub use crate::runtime::cycle::CycleResult;
pub use crate::runtime::{EventLoop, ExitReason, LoopSettings};
pub use crate::runtime::signals::SignalHandler;

// Terminal
pub use crate::tui::render::{CrosstermTerminal, Terminal};
pub use crate::tui::terminal_guard::TerminalGuard;
