//! FLW-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FollowError>;

/// Top-level error type for follow.
///
/// The `Spawn`, `Read`, `Allocation` and `Decode` variants are per-cycle: they end
/// up in the published cycle result and the next refresh starts from scratch. The
/// rest abort the program.
#[derive(Debug, Error)]
pub enum FollowError {
    #[error("[FLW-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FLW-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FLW-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FLW-2001] cannot run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[FLW-2002] reading command output failed: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    #[error("[FLW-2003] output buffer exhausted after {collected} bytes")]
    Allocation { collected: usize },

    #[error("[FLW-2004] output is not valid UTF-8 (byte {offset})")]
    Decode { offset: usize },

    #[error("[FLW-3001] not attached to an interactive terminal")]
    NotATerminal,

    #[error("[FLW-3002] terminal setup failed: {source}")]
    TerminalSetup {
        #[source]
        source: std::io::Error,
    },

    #[error("[FLW-3003] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FLW-3004] terminal IO failure: {source}")]
    Terminal {
        #[source]
        source: std::io::Error,
    },
}

impl FollowError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FLW-1001",
            Self::MissingConfig { .. } => "FLW-1002",
            Self::ConfigParse { .. } => "FLW-1003",
            Self::Spawn { .. } => "FLW-2001",
            Self::Read { .. } => "FLW-2002",
            Self::Allocation { .. } => "FLW-2003",
            Self::Decode { .. } => "FLW-2004",
            Self::NotATerminal => "FLW-3001",
            Self::TerminalSetup { .. } => "FLW-3002",
            Self::Io { .. } => "FLW-3003",
            Self::Terminal { .. } => "FLW-3004",
        }
    }

    /// Whether the failure is scoped to one refresh cycle.
    #[must_use]
    pub const fn is_per_cycle(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::Read { .. } | Self::Allocation { .. } | Self::Decode { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<toml::de::Error> for FollowError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
