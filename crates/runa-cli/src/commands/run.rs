//! `runa run`: build the app and run its run-command.

use std::process::ExitCode;

use clap::Args;
use runa_runtime::engine::Engine;

use super::{ImageArgs, container_exit, handle_interrupts};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source and image options.
    #[command(flatten)]
    pub image: ImageArgs,

    /// Arguments appended to the run-command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the `run` command, exiting with the container's status.
///
/// # Errors
///
/// Returns an error if the app cannot be built, compiled, or started.
pub fn execute(engine: &Engine, args: &RunArgs) -> anyhow::Result<ExitCode> {
    handle_interrupts(engine)?;
    let status = engine.run(&args.image.source, &args.image.options(), &args.args)?;
    Ok(container_exit(status))
}
