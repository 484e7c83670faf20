//! Child process execution and output collection.

pub mod accumulator;
pub mod runner;
