//! Append-only JSONL cycle log with rotation and graceful degradation.

pub mod jsonl;
