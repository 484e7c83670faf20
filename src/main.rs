#![forbid(unsafe_code)]

//! follow command-line entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = match cli_app::Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage errors are user errors (exit 1); help and version are not errors.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    if let Err(e) = cli_app::run(&args) {
        cli_app::report(&e);
        std::process::exit(e.exit_code());
    }
}
