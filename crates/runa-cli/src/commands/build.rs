//! `runa build`: compose the app into a tagged image.

use std::io::Write;
use std::process::ExitCode;

use clap::Args;
use runa_runtime::engine::Engine;

use super::ImageArgs;
use crate::output;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Source and image options.
    #[command(flatten)]
    pub image: ImageArgs,
}

/// Executes the `build` command.
///
/// Prints the image tag on stdout so scripts can capture it.
///
/// # Errors
///
/// Returns an error if the app cannot be resolved or composed.
pub fn execute(engine: &Engine, args: &BuildArgs) -> anyhow::Result<ExitCode> {
    let image = engine.build(&args.image.source, &args.image.options())?;
    output::done("Built", &image.tag, image.base.as_str());
    writeln!(std::io::stdout().lock(), "{}", image.tag)?;
    Ok(ExitCode::SUCCESS)
}
