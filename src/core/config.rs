//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{FollowError, Result};

/// Full follow configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub refresh: RefreshConfig,
    pub command: CommandConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
    /// Where this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between the starts of two cycles; fractional values allowed.
    pub interval_secs: f64,
}

/// How the watched command is executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Wrap the command as `shell_path -c "<args joined by spaces>"`.
    pub shell: bool,
    pub shell_path: PathBuf,
    /// Kill and reap a still-running child when the pager exits.
    pub kill_child_on_exit: bool,
}

/// How output is collected and decoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Byte ceiling per cycle; 0 means unlimited.
    pub max_output_bytes: usize,
    pub decode: DecodeMode,
    pub tab_width: usize,
}

/// Behavior on byte sequences that are not valid UTF-8.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Reject the whole cycle with a decode error.
    #[default]
    Strict,
    /// Substitute U+FFFD for invalid sequences.
    Lossy,
}

/// JSONL cycle log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Empty path disables the log.
    pub jsonl_path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 1.0 }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            shell: false,
            shell_path: PathBuf::from("/bin/sh"),
            kill_child_on_exit: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 0,
            decode: DecodeMode::Strict,
            tab_width: 8,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            jsonl_path: PathBuf::new(),
            fallback_path: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl RefreshConfig {
    /// Interval as a `Duration`. Only meaningful after validation.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

impl OutputConfig {
    /// Byte ceiling, `None` when unlimited.
    #[must_use]
    pub const fn byte_limit(&self) -> Option<usize> {
        if self.max_output_bytes == 0 {
            None
        } else {
            Some(self.max_output_bytes)
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.jsonl_path.as_os_str().is_empty()
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("follow").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FollowError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FollowError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FOLLOW_INTERVAL_SECS") {
            self.refresh.interval_secs = parse_env("FOLLOW_INTERVAL_SECS", &raw)?;
        }

        if let Some(raw) = lookup("FOLLOW_SHELL") {
            self.command.shell = parse_env("FOLLOW_SHELL", &raw)?;
        }
        if let Some(raw) = lookup("FOLLOW_SHELL_PATH") {
            self.command.shell_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("FOLLOW_KILL_CHILD_ON_EXIT") {
            self.command.kill_child_on_exit = parse_env("FOLLOW_KILL_CHILD_ON_EXIT", &raw)?;
        }

        if let Some(raw) = lookup("FOLLOW_MAX_OUTPUT_BYTES") {
            self.output.max_output_bytes = parse_env("FOLLOW_MAX_OUTPUT_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("FOLLOW_DECODE") {
            self.output.decode = match raw.trim().to_ascii_lowercase().as_str() {
                "strict" => DecodeMode::Strict,
                "lossy" => DecodeMode::Lossy,
                other => {
                    return Err(FollowError::ConfigParse {
                        context: "env",
                        details: format!("FOLLOW_DECODE={other:?}: expected strict or lossy"),
                    });
                }
            };
        }
        if let Some(raw) = lookup("FOLLOW_TAB_WIDTH") {
            self.output.tab_width = parse_env("FOLLOW_TAB_WIDTH", &raw)?;
        }

        if let Some(raw) = lookup("FOLLOW_LOG_PATH") {
            self.log.jsonl_path = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Check cross-field constraints. Called by [`Config::load`] and again after
    /// CLI flags are merged in.
    pub fn validate(&self) -> Result<()> {
        let interval = self.refresh.interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(FollowError::InvalidConfig {
                details: format!("refresh.interval_secs must be > 0, got {interval}"),
            });
        }
        // Duration::from_secs_f64 panics past u64::MAX seconds.
        if interval > 31_536_000.0 {
            return Err(FollowError::InvalidConfig {
                details: format!("refresh.interval_secs must be <= 1 year, got {interval}"),
            });
        }

        if self.command.shell && self.command.shell_path.as_os_str().is_empty() {
            return Err(FollowError::InvalidConfig {
                details: "command.shell_path must be set when command.shell=true".to_string(),
            });
        }

        if self.output.tab_width == 0 || self.output.tab_width > 64 {
            return Err(FollowError::InvalidConfig {
                details: format!(
                    "output.tab_width must be in [1, 64], got {}",
                    self.output.tab_width
                ),
            });
        }

        if self.log.is_enabled() && self.log.max_rotated_files == 0 {
            return Err(FollowError::InvalidConfig {
                details: "log.max_rotated_files must be >= 1".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| FollowError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
