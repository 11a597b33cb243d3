//! # runa
//!
//! Build, run, exec into, and test an app inside a container.
//! The app source is a local directory or a remote repository URL.

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use runa_common::error::RunaError;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match commands::execute(cli) {
        Ok(code) => code,
        Err(err) => {
            output::failure(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RunaError>()
        .map_or(1, RunaError::exit_code)
}
