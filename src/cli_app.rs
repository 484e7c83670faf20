//! Command-line definition and session bootstrap.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::{Colorize, control};
use thiserror::Error;

use follow::core::config::Config;
use follow::core::errors::FollowError;
use follow::logger::jsonl::{JsonlConfig, JsonlWriter};
use follow::pager::keys;
use follow::process::runner::CommandSpec;
use follow::runtime::signals::SignalHandler;
use follow::runtime::{EventLoop, ExitReason, LoopSettings};
use follow::tui::render::CrosstermTerminal;
use follow::tui::terminal_guard::TerminalGuard;

/// Re-run a command periodically and page through its output.
#[derive(Debug, Parser)]
#[command(
    name = "follow",
    author,
    version,
    about = "Re-run a command periodically and page through its output",
    long_about = None,
    after_help = key_help(),
    arg_required_else_help = true
)]
pub struct Cli {
    /// Seconds between refreshes; fractions allowed.
    #[arg(short = 'n', long, value_name = "SECONDS", allow_negative_numbers = true)]
    interval: Option<f64>,
    /// Run the command through the shell (`sh -c`).
    #[arg(short, long)]
    shell: bool,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Append a JSONL record of every cycle to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Command to run, with its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

/// Top-level CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad arguments or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) => 2,
        }
    }
}

impl From<FollowError> for CliError {
    fn from(err: FollowError) -> Self {
        match err {
            FollowError::InvalidConfig { .. }
            | FollowError::MissingConfig { .. }
            | FollowError::ConfigParse { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

fn key_help() -> String {
    let mut help = String::from("Keys:\n");
    for binding in keys::bindings() {
        help.push_str(&format!("  {:<20} {}\n", binding.keys, binding.description));
    }
    help
}

/// Print `err` the way every failure is reported.
pub fn report(err: &CliError) {
    eprintln!("{} {err}", "follow:".red().bold());
}

/// Run one session until quit or a terminating signal.
pub fn run(cli: &Cli) -> Result<ExitReason, CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;
    let config = apply_cli_overrides(cli, config)?;
    let command = command_spec(cli, &config)?;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(FollowError::NotATerminal.into());
    }

    let signals = SignalHandler::new()
        .map_err(|e| CliError::Runtime(format!("failed to register signal handlers: {e}")))?;
    let log = JsonlConfig::from_log_config(&config.log)
        .map_or_else(JsonlWriter::disabled, JsonlWriter::open);

    let guard = TerminalGuard::new().map_err(|source| FollowError::TerminalSetup { source })?;
    let mut event_loop = EventLoop::new(
        LoopSettings::from_config(&config, command),
        CrosstermTerminal::new(),
        signals,
        log,
    );
    let outcome = event_loop.run();
    drop(event_loop);
    drop(guard);
    Ok(outcome?)
}

/// Command-line flags take precedence over the file and the environment.
fn apply_cli_overrides(cli: &Cli, mut config: Config) -> Result<Config, CliError> {
    if let Some(interval) = cli.interval {
        config.refresh.interval_secs = interval;
    }
    if cli.shell {
        config.command.shell = true;
    }
    if let Some(path) = &cli.log_file {
        config.log.jsonl_path.clone_from(path);
    }
    config.validate()?;
    Ok(config)
}

fn command_spec(cli: &Cli, config: &Config) -> Result<CommandSpec, CliError> {
    let spec = if config.command.shell {
        CommandSpec::shell(Path::new(&config.command.shell_path), &cli.command)
    } else {
        CommandSpec::direct(cli.command.clone())
    };
    Ok(spec?)
}
