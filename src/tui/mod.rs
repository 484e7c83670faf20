//! Terminal side of the pager: readiness wait, frame rendering and the
//! raw-mode guard.

#![allow(missing_docs)]

pub mod readiness;
pub mod render;
pub mod terminal_guard;

#[cfg(test)]
pub(crate) mod test_harness;
