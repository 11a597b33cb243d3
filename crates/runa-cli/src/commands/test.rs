//! `runa test`: build the app and run its test-command.

use std::process::ExitCode;

use clap::Args;
use runa_runtime::engine::Engine;

use super::{ImageArgs, container_exit, handle_interrupts};

/// Arguments for the `test` command.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Source and image options.
    #[command(flatten)]
    pub image: ImageArgs,

    /// Arguments appended to the test-command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the `test` command, exiting with the container's status.
///
/// # Errors
///
/// Returns an error if the manifest has no test-command or the app cannot
/// be built or started.
pub fn execute(engine: &Engine, args: &TestArgs) -> anyhow::Result<ExitCode> {
    handle_interrupts(engine)?;
    let status = engine.test(&args.image.source, &args.image.options(), &args.args)?;
    Ok(container_exit(status))
}
