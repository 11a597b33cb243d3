//! CLI command definitions and dispatch.

pub mod build;
pub mod exec;
pub mod init;
pub mod run;
pub mod test;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use runa_common::config::RunaConfig;
use runa_common::constants::CONFIG_ENV;
use runa_common::types::ExitStatus;
use runa_runtime::engine::{BuildOptions, Engine};

/// runa: build, run, and test apps inside containers.
#[derive(Parser, Debug)]
#[command(name = "runa", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON configuration file.
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose the app into a tagged container image.
    Build(build::BuildArgs),
    /// Build the app and run its run-command.
    Run(run::RunArgs),
    /// Build the app and run an arbitrary command in it.
    Exec(exec::ExecArgs),
    /// Build the app and run its test-command.
    Test(test::TestArgs),
    /// Write a minimal Appfile into a directory.
    Init(init::InitArgs),
}

/// Arguments shared by every verb that composes an image.
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Local directory or remote repository URL (`#ref` selects a branch or tag).
    pub source: String,

    /// Tag for the composed image.
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Runtime to use instead of the Appfile's builder-image.
    #[arg(short = 'i', long)]
    pub builder_image: Option<String>,
}

impl ImageArgs {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            tag: self.tag.clone(),
            builder_image: self.builder_image.clone(),
            tty: std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
        }
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if configuration loading or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = RunaConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "loading configuration{}",
            cli.config
                .as_ref()
                .map(|p| format!(" from {}", p.display()))
                .unwrap_or_default()
        )
    })?;
    let engine = Engine::new(config)?;

    match cli.command {
        Command::Build(args) => build::execute(&engine, &args),
        Command::Run(args) => run::execute(&engine, &args),
        Command::Exec(args) => exec::execute(&engine, &args),
        Command::Test(args) => test::execute(&engine, &args),
        Command::Init(args) => init::execute(&engine, &args),
    }
}

/// Kills the active container when the user presses Ctrl+C.
fn handle_interrupts(engine: &Engine) -> anyhow::Result<()> {
    let cancel = engine.cancel_handle();
    ctrlc::set_handler(move || {
        tracing::info!("interrupted, stopping container");
        cancel.cancel();
    })
    .context("failed to set Ctrl+C handler")
}

/// Process exit code mirroring a container's exit status.
fn container_exit(status: ExitStatus) -> ExitCode {
    if !status.success() {
        tracing::debug!(code = status.code(), "container exited non-zero");
    }
    ExitCode::from(status.process_code())
}
