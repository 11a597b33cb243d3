//! Unified error types for the runa workspace.
//!
//! Every component reports failures through [`RunaError`]. The CLI maps
//! each variant to a distinct process exit code with [`RunaError::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RunaError {
    /// The source reference could not be fetched or does not exist.
    #[error("source unavailable: {reference}: {reason}")]
    SourceUnavailable {
        /// Local path or remote URL as given by the caller.
        reference: String,
        /// Why the source could not be materialized.
        reason: String,
    },

    /// The source was fetched but has no recognizable app root.
    #[error("invalid source at {path}: {reason}")]
    SourceInvalid {
        /// Root of the working tree that was inspected.
        path: PathBuf,
        /// What is missing or wrong.
        reason: String,
    },

    /// The manifest names a runtime absent from the runtime table.
    #[error("unknown runtime '{name}' (known: {known})")]
    UnknownRuntime {
        /// Runtime name as written in the manifest.
        name: String,
        /// Comma-separated list of supported runtime names.
        known: String,
    },

    /// The image builder failed to produce the composed image.
    #[error("composition of image '{tag}' failed: {reason}")]
    CompositionFailed {
        /// Tag that was being built.
        tag: String,
        /// Underlying builder failure.
        reason: String,
    },

    /// `run` was requested but the manifest has no run command.
    #[error("no run-command in manifest and runtime '{runtime}' has no default")]
    NoRunCommand {
        /// Runtime of the manifest.
        runtime: String,
    },

    /// `test` was requested but the manifest has no test command.
    #[error("no test-command in manifest")]
    NoTestCommand,

    /// The in-container compile step failed.
    #[error("build step for runtime '{runtime}' failed: {reason}")]
    BuildStepFailed {
        /// Runtime whose compile command was executed.
        runtime: String,
        /// Exit status or start failure description.
        reason: String,
    },

    /// The container could not be started.
    #[error("failed to execute in image '{image}': {reason}")]
    ExecutionFailed {
        /// Image the container was started from.
        image: String,
        /// Why the container runtime could not start it.
        reason: String,
    },

    /// The manifest file exists but cannot be understood.
    #[error("invalid manifest {path}:{line}: {message}")]
    InvalidManifest {
        /// Manifest file path.
        path: PathBuf,
        /// One-based line number, zero when not line-specific.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl RunaError {
    /// Process exit code reported by the CLI for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::SourceUnavailable { .. } => 2,
            Self::SourceInvalid { .. } => 3,
            Self::UnknownRuntime { .. } => 4,
            Self::CompositionFailed { .. } => 5,
            Self::NoRunCommand { .. } => 6,
            Self::NoTestCommand => 7,
            Self::BuildStepFailed { .. } => 8,
            Self::ExecutionFailed { .. } => 9,
            Self::InvalidManifest { .. }
            | Self::Io { .. }
            | Self::Config { .. }
            | Self::Serialization { .. } => 1,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RunaError>;
