#![forbid(unsafe_code)]

//! follow: re-run a command periodically and page through its output.
//!
//! A `watch`-style runner combined with a `less`-style pager: the command is
//! spawned on a timer, its merged stdout/stderr is collected without blocking
//! the interface, and each completed run replaces the view while scroll
//! position (or a pin to the end) is preserved.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use follow::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use follow::pager::index::TextIndexer;
//! use follow::pager::viewport::{Bounds, ScrollIntent, Viewport};
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod pager;
pub mod process;
pub mod runtime;
pub mod tui;
