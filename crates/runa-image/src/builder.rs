//! Image builder abstraction and the Docker CLI implementation.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::context::BuildContext;

/// Failure reported by an image builder.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The builder process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Streaming the context to the builder failed.
    #[error("failed to send build context: {0}")]
    Stream(#[source] std::io::Error),

    /// The builder ran and reported failure.
    #[error("builder exited with {status}")]
    Exited {
        /// Exit status description.
        status: String,
    },
}

/// Something that turns a build context into a tagged image.
///
/// Implementors must make `tag` point at the new image, replacing any
/// previous mapping.
pub trait ImageBuilder: Send + Sync {
    /// Builds `context` and tags the result, returning the image ID.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the image cannot be produced.
    fn build(&self, context: &BuildContext, tag: &str) -> Result<String, BuildError>;
}

/// Builds images with `docker build`, streaming the context on stdin.
#[derive(Debug, Clone)]
pub struct DockerBuilder {
    docker_bin: PathBuf,
}

impl DockerBuilder {
    /// Creates a builder that invokes `docker_bin`.
    #[must_use]
    pub fn new(docker_bin: impl Into<PathBuf>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
        }
    }
}

impl ImageBuilder for DockerBuilder {
    fn build(&self, context: &BuildContext, tag: &str) -> Result<String, BuildError> {
        let program = self.docker_bin.display().to_string();
        tracing::info!(tag, base = %context.base(), "running docker build");

        let mut child = Command::new(&self.docker_bin)
            .args(["build", "--quiet", "--tag", tag, "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: program.clone(),
                source,
            })?;

        // A send failure is reported only when the build itself succeeded.
        let sent = child.stdin.take().map_or_else(
            || Err(std::io::Error::other("stdin not captured")),
            |stdin| {
                let mut encoder = flate2::write::GzEncoder::new(stdin, flate2::Compression::fast());
                encoder.write_all(context.archive())?;
                encoder.finish().map(drop)
            },
        );

        let output = child.wait_with_output().map_err(BuildError::Stream)?;
        if !output.status.success() {
            return Err(BuildError::Exited {
                status: output.status.to_string(),
            });
        }
        sent.map_err(BuildError::Stream)?;

        let image_id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        tracing::debug!(tag, image_id, "docker build finished");
        Ok(image_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_docker_binary_is_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = BuildContext::generate(
            &runa_common::types::ImageRef::new("busybox:1.36"),
            dir.path(),
            "/tmp/app",
        )
        .expect("context");
        let builder = DockerBuilder::new("/nonexistent/bin/docker");
        let err = builder.build(&ctx, "runa/test").unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }), "{err}");
    }
}
