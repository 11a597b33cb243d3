//! Command execution inside containers started from composed images.

use std::sync::Arc;

use runa_common::error::{Result, RunaError};
use runa_common::types::{ContainerName, ExitStatus, ImageRef};

use crate::backend::ContainerBackend;
use crate::cancel::CancelHandle;

/// A single command to run in a fresh container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Image the container is started from.
    pub image: ImageRef,
    /// Base command, already split into arguments.
    pub command: Vec<String>,
    /// Arguments appended after `command`.
    pub extra_args: Vec<String>,
    /// Working directory inside the container.
    pub workdir: String,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Attach the caller's terminal.
    pub tty: bool,
}

impl ExecutionRequest {
    /// Creates a request with no extra arguments or environment.
    #[must_use]
    pub fn new(image: ImageRef, command: Vec<String>, workdir: impl Into<String>) -> Self {
        Self {
            image,
            command,
            extra_args: Vec::new(),
            workdir: workdir.into(),
            env: Vec::new(),
            tty: false,
        }
    }

    /// Sets the arguments appended after the command.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Sets extra environment variables.
    #[must_use]
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Sets whether the caller's terminal is attached.
    #[must_use]
    pub const fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// The full argument vector: `command` followed by `extra_args`.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        self.command
            .iter()
            .chain(&self.extra_args)
            .cloned()
            .collect()
    }
}

/// Runs requests through a [`ContainerBackend`], one container at a time.
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn ContainerBackend>,
    cancel: CancelHandle,
}

impl Executor {
    /// Creates an executor whose containers can be stopped through `cancel`.
    #[must_use]
    pub fn new(backend: Arc<dyn ContainerBackend>, cancel: CancelHandle) -> Self {
        Self { backend, cancel }
    }

    /// The backend containers are started on.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn ContainerBackend> {
        &self.backend
    }

    /// Runs `request` in a throwaway container and returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::ExecutionFailed` if the container cannot be
    /// started or the invocation was cancelled.
    pub fn run(&self, request: &ExecutionRequest) -> Result<ExitStatus> {
        self.run_as(&ContainerName::generate(), request, true)
    }

    /// Runs `request` in a container called `name`.
    ///
    /// With `remove` unset the container is kept after it exits.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::ExecutionFailed` if the container cannot be
    /// started or the invocation was cancelled.
    pub fn run_as(
        &self,
        name: &ContainerName,
        request: &ExecutionRequest,
        remove: bool,
    ) -> Result<ExitStatus> {
        let Some(_active) = self.cancel.track(name) else {
            return Err(RunaError::ExecutionFailed {
                image: request.image.to_string(),
                reason: "cancelled".into(),
            });
        };

        tracing::info!(image = %request.image, container = %name, "starting container");
        tracing::debug!(argv = ?request.argv(), "container command");
        let status = self.backend.run(name, request, remove)?;
        tracing::info!(container = %name, code = status.code(), "container exited");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        runs: Mutex<Vec<(String, Vec<String>, bool)>>,
    }

    impl ContainerBackend for Recorder {
        fn run(
            &self,
            name: &ContainerName,
            request: &ExecutionRequest,
            remove: bool,
        ) -> Result<ExitStatus> {
            self.runs
                .lock()
                .expect("lock")
                .push((name.to_string(), request.argv(), remove));
            Ok(ExitStatus::new(3))
        }
        fn commit(&self, _: &ContainerName, _: &str) -> Result<()> {
            Ok(())
        }
        fn remove(&self, _: &ContainerName) -> Result<()> {
            Ok(())
        }
        fn kill(&self, _: &ContainerName) -> Result<()> {
            Ok(())
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    fn executor() -> (Arc<Recorder>, Executor) {
        let backend = Arc::new(Recorder::default());
        let executor = Executor::new(backend.clone(), CancelHandle::new(backend.clone()));
        (backend, executor)
    }

    #[test]
    fn argv_appends_extra_args_in_order() {
        let request = ExecutionRequest::new(
            ImageRef::new("my/app"),
            vec!["sh".into(), "-c".into()],
            "/tmp/app",
        )
        .with_extra_args(vec!["b".into(), "a".into()]);
        assert_eq!(request.argv(), vec!["sh", "-c", "b", "a"]);
    }

    #[test]
    fn run_returns_program_status_and_removes_container() {
        let (backend, executor) = executor();
        let request = ExecutionRequest::new(ImageRef::new("my/app"), vec!["false".into()], "/tmp/app");

        let status = executor.run(&request).expect("run");
        assert_eq!(status.code(), 3);

        let runs = backend.runs.lock().expect("lock");
        assert_eq!(runs.len(), 1);
        assert!(runs[0].0.starts_with("runa-"));
        assert!(runs[0].2);
    }

    #[test]
    fn cancelled_executor_starts_nothing() {
        let (backend, executor) = executor();
        executor.cancel.cancel();
        let request = ExecutionRequest::new(ImageRef::new("my/app"), vec!["true".into()], "/tmp/app");

        let err = executor.run(&request).unwrap_err();
        assert!(matches!(err, RunaError::ExecutionFailed { .. }));
        assert!(backend.runs.lock().expect("lock").is_empty());
    }
}
