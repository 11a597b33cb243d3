//! `runa init`: scaffold a minimal Appfile.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use runa_runtime::engine::Engine;

use crate::output;

/// Arguments for the `init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write the Appfile into. Created if missing.
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Runtime to record instead of the detected one.
    #[arg(short = 'i', long)]
    pub builder_image: Option<String>,

    /// Overwrite an existing Appfile.
    #[arg(long)]
    pub force: bool,
}

/// Executes the `init` command.
///
/// # Errors
///
/// Returns an error if an Appfile already exists without `--force`, the
/// runtime is unknown, or the file cannot be written.
pub fn execute(engine: &Engine, args: &InitArgs) -> anyhow::Result<ExitCode> {
    let path = engine.init(&args.directory, args.builder_image.as_deref(), args.force)?;
    output::done("Wrote", &path.display().to_string(), "");
    Ok(ExitCode::SUCCESS)
}
