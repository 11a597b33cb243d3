//! `runa exec`: build the app and run an arbitrary command in it.

use std::process::ExitCode;

use clap::Args;
use runa_runtime::engine::Engine;

use super::{ImageArgs, container_exit, handle_interrupts};

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Source and image options.
    #[command(flatten)]
    pub image: ImageArgs,

    /// Command to execute, with its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command.
///
/// The Appfile's run and test commands are ignored.
///
/// # Errors
///
/// Returns an error if the app cannot be built or the container cannot start.
pub fn execute(engine: &Engine, args: &ExecArgs) -> anyhow::Result<ExitCode> {
    handle_interrupts(engine)?;
    let status = engine.exec(&args.image.source, &args.image.options(), &args.command)?;
    Ok(container_exit(status))
}
