//! Container backend driving the `docker` CLI.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use runa_common::error::{Result, RunaError};
use runa_common::types::{ContainerName, ExitStatus};

use super::ContainerBackend;
use crate::exec::ExecutionRequest;

/// Backend that shells out to `docker`.
///
/// A container is first created with `docker create` and then run with
/// `docker start --attach`, which inherits the caller's stdout and stderr
/// so container output is streamed as it is produced. The exit code of
/// `docker start --attach` is the program's own status.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    docker_bin: PathBuf,
}

impl DockerBackend {
    /// Creates a backend that invokes `docker_bin`.
    #[must_use]
    pub fn new(docker_bin: impl Into<PathBuf>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
        }
    }

    /// Arguments passed to `docker` for creating the container of `request`.
    #[must_use]
    pub fn create_args(
        name: &ContainerName,
        request: &ExecutionRequest,
        remove: bool,
    ) -> Vec<String> {
        let mut args = vec!["create".to_owned()];
        if remove {
            args.push("--rm".into());
        }
        args.extend(["--name".into(), name.to_string()]);
        args.extend(["--workdir".into(), request.workdir.clone()]);
        if request.tty {
            args.extend(["--interactive".into(), "--tty".into()]);
        }
        for (key, value) in &request.env {
            args.extend(["--env".into(), format!("{key}={value}")]);
        }
        args.push(request.image.to_string());
        args.extend(request.argv());
        args
    }

    /// Arguments passed to `docker` for starting a created container.
    #[must_use]
    pub fn start_args(name: &ContainerName, request: &ExecutionRequest) -> Vec<String> {
        let mut args = vec!["start".to_owned(), "--attach".to_owned()];
        if request.tty {
            args.push("--interactive".into());
        }
        args.push(name.to_string());
        args
    }

    /// Runs a short housekeeping command, capturing stderr for errors.
    fn housekeeping<S: AsRef<std::ffi::OsStr>>(
        &self,
        args: &[S],
    ) -> std::result::Result<(), String> {
        let output = Command::new(&self.docker_bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.docker_bin.display()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "docker {} exited with {}: {}",
                args.first()
                    .map(|a| a.as_ref().to_string_lossy())
                    .unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

impl ContainerBackend for DockerBackend {
    fn run(
        &self,
        name: &ContainerName,
        request: &ExecutionRequest,
        remove: bool,
    ) -> Result<ExitStatus> {
        let failed = |reason: String| RunaError::ExecutionFailed {
            image: request.image.to_string(),
            reason,
        };

        let create = Self::create_args(name, request, remove);
        tracing::debug!(container = %name, args = ?create, "docker create");
        self.housekeeping(&create).map_err(failed)?;

        let start = Self::start_args(name, request);
        tracing::debug!(container = %name, args = ?start, "docker start");
        let status = Command::new(&self.docker_bin)
            .args(&start)
            .stdin(if request.tty {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| failed(format!("failed to run {}: {e}", self.docker_bin.display())))?;

        Ok(ExitStatus::new(status.code().unwrap_or(-1)))
    }

    fn commit(&self, name: &ContainerName, tag: &str) -> Result<()> {
        tracing::debug!(container = %name, tag, "docker commit");
        self.housekeeping(&["commit", name.as_str(), tag])
            .map_err(|reason| RunaError::ExecutionFailed {
                image: tag.to_owned(),
                reason,
            })
    }

    fn remove(&self, name: &ContainerName) -> Result<()> {
        self.housekeeping(&["rm", "--force", name.as_str()])
            .map_err(|message| RunaError::Config { message })
    }

    fn kill(&self, name: &ContainerName) -> Result<()> {
        tracing::info!(container = %name, "killing container");
        self.housekeeping(&["kill", name.as_str()])
            .map_err(|message| RunaError::Config { message })
    }

    fn is_available(&self) -> bool {
        which::which(&self.docker_bin).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use runa_common::types::ImageRef;

    use super::*;

    fn request() -> ExecutionRequest {
        ExecutionRequest::new(ImageRef::new("my/app"), vec!["echo".into()], "/tmp/app")
            .with_extra_args(vec!["--first-arg".into(), "first-value".into()])
    }

    /// Writes an executable shell script standing in for `docker`.
    #[cfg(unix)]
    fn fake_docker(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("docker");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path
    }

    #[test]
    fn create_args_place_argv_after_image() {
        let name = ContainerName::new("runa-test");
        let args = DockerBackend::create_args(&name, &request(), true);
        assert_eq!(
            args,
            vec![
                "create",
                "--rm",
                "--name",
                "runa-test",
                "--workdir",
                "/tmp/app",
                "my/app",
                "echo",
                "--first-arg",
                "first-value",
            ]
        );
    }

    #[test]
    fn create_args_keep_container_and_pass_env() {
        let name = ContainerName::new("runa-build");
        let request = request().with_env(vec![("GO111MODULE".into(), "auto".into())]);
        let args = DockerBackend::create_args(&name, &request, false);
        assert!(!args.contains(&"--rm".to_owned()));
        let env_at = args.iter().position(|a| a == "--env").expect("env flag");
        assert_eq!(args[env_at + 1], "GO111MODULE=auto");
        let image_at = args.iter().position(|a| a == "my/app").expect("image");
        assert!(env_at < image_at);
    }

    #[test]
    fn tty_requests_interactive_create_and_start() {
        let request = request().with_tty(true);
        let name = ContainerName::new("runa-tty");
        let create = DockerBackend::create_args(&name, &request, true);
        assert!(create.contains(&"--interactive".to_owned()));
        assert!(create.contains(&"--tty".to_owned()));
        assert_eq!(
            DockerBackend::start_args(&name, &request),
            vec!["start", "--attach", "--interactive", "runa-tty"]
        );
        assert_eq!(
            DockerBackend::start_args(&name, &request.with_tty(false)),
            vec!["start", "--attach", "runa-tty"]
        );
    }

    #[test]
    fn missing_docker_binary_is_execution_failure() {
        let backend = DockerBackend::new("/nonexistent/bin/docker");
        assert!(!backend.is_available());
        let err = backend
            .run(&ContainerName::new("runa-x"), &request(), true)
            .unwrap_err();
        assert!(matches!(err, RunaError::ExecutionFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn program_exit_status_is_returned_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let docker = fake_docker(
            dir.path(),
            r#"case "$1" in create) echo c0ffee ;; start) exit 125 ;; esac"#,
        );
        let backend = DockerBackend::new(docker);

        let status = backend
            .run(&ContainerName::new("runa-status"), &request(), true)
            .expect("container ran");
        assert_eq!(status.code(), 125);
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[test]
    fn failed_create_is_execution_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let docker = fake_docker(
            dir.path(),
            r#"case "$1" in create) echo "No such image: my/app" >&2; exit 125 ;; start) exit 0 ;; esac"#,
        );
        let backend = DockerBackend::new(docker);

        let err = backend
            .run(&ContainerName::new("runa-missing"), &request(), true)
            .unwrap_err();
        assert!(
            matches!(
                &err,
                RunaError::ExecutionFailed { image, reason }
                    if image == "my/app" && reason.contains("No such image")
            ),
            "{err}"
        );
    }
}
