//! Container backend abstraction.

pub mod docker;

use runa_common::error::Result;
use runa_common::types::{ContainerName, ExitStatus};

use crate::exec::ExecutionRequest;

/// Starts and manages containers on behalf of the executor.
///
/// Implementors handle the details of talking to a concrete container
/// runtime. Output of `run` must reach the caller's stdout and stderr as it
/// is produced.
pub trait ContainerBackend: Send + Sync {
    /// Runs `request` in a new container called `name` and waits for it.
    ///
    /// With `remove` set the container is deleted once it exits.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::ExecutionFailed` if the container cannot be
    /// started. A program exiting non-zero is reported as an `ExitStatus`.
    fn run(&self, name: &ContainerName, request: &ExecutionRequest, remove: bool)
    -> Result<ExitStatus>;

    /// Saves the filesystem of a stopped container as image `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit(&self, name: &ContainerName, tag: &str) -> Result<()>;

    /// Deletes a container, stopping it first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, name: &ContainerName) -> Result<()>;

    /// Stops a running container immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be killed.
    fn kill(&self, name: &ContainerName) -> Result<()>;

    /// Returns whether this backend can be used on the current host.
    fn is_available(&self) -> bool;
}

