//! Engine that orchestrates the runa verbs.
//!
//! Every verb follows the same ordering: resolve the source, establish the
//! manifest, select the base image, compose the app image, then (for the
//! executing verbs) run a container from it. Remote working trees are owned
//! by the verb's stack frame and removed when it returns, on every path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use runa_app::detect::{self, Detector};
use runa_app::manifest::{self, AppManifest};
use runa_app::source::{self, WorkingTree};
use runa_common::config::{RunaConfig, RuntimeSpec};
use runa_common::error::{Result, RunaError};
use runa_common::types::{ExitStatus, ImageRef};
use runa_image::builder::{DockerBuilder, ImageBuilder};
use runa_image::compose::{ComposedImage, Compositor};
use runa_image::selector::RuntimeTable;

use crate::autobuild::AutoBuilder;
use crate::backend::ContainerBackend;
use crate::backend::docker::DockerBackend;
use crate::cancel::CancelHandle;
use crate::exec::{ExecutionRequest, Executor};

/// Options shared by `build`, `run`, `exec`, and `test`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Tag for the composed image. A content-addressed tag is used when unset.
    pub tag: Option<String>,
    /// Runtime overriding, or standing in for, the manifest's builder image.
    pub builder_image: Option<String>,
    /// Attach the caller's terminal to the container.
    pub tty: bool,
}

/// A resolved app ready to be composed.
struct Prepared {
    tree: WorkingTree,
    manifest: AppManifest,
    runtime: RuntimeSpec,
    base: ImageRef,
}

/// The runa engine.
pub struct Engine {
    config: RunaConfig,
    table: RuntimeTable,
    detectors: Vec<Box<dyn Detector>>,
    compositor: Compositor,
    executor: Executor,
    autobuilder: AutoBuilder,
    cancel: CancelHandle,
}

impl Engine {
    /// Creates an engine driving the `docker` and `git` binaries named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::Config` if the configuration is invalid.
    pub fn new(config: RunaConfig) -> Result<Self> {
        let builder = Arc::new(DockerBuilder::new(&config.docker_bin));
        let backend = Arc::new(DockerBackend::new(&config.docker_bin));
        if !backend.is_available() {
            tracing::warn!(
                docker = %config.docker_bin.display(),
                "container CLI not found on PATH"
            );
        }
        Self::with_components(config, builder, backend)
    }

    /// Creates an engine with explicit builder and backend implementations.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::Config` if the configuration is invalid.
    pub fn with_components(
        config: RunaConfig,
        builder: Arc<dyn ImageBuilder>,
        backend: Arc<dyn ContainerBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let table = RuntimeTable::from_config(&config);
        let detectors = detect::detectors_from_config(&config);
        let compositor = Compositor::new(builder, &config.app_path, &config.tag_repository);
        let cancel = CancelHandle::new(Arc::clone(&backend));
        let executor = Executor::new(backend, cancel.clone());
        let autobuilder = AutoBuilder::new(executor.clone(), table.clone());
        Ok(Self {
            config,
            table,
            detectors,
            compositor,
            executor,
            autobuilder,
            cancel,
        })
    }

    /// Handle for stopping the container currently started by this engine.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Composes the app at `source` into a tagged image.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be resolved, the manifest is
    /// missing or invalid, the runtime is unknown, or composition fails.
    pub fn build(&self, source: &str, options: &BuildOptions) -> Result<ComposedImage> {
        let prepared = self.prepare(source, options)?;
        let image = self.compose(&prepared, options)?;
        prepared.tree.release()?;
        Ok(image)
    }

    /// Builds the app, compiles it if its runtime requires it, and runs its
    /// run command with `extra_args` appended.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::NoRunCommand` before composing anything when no
    /// command can be derived, `RunaError::BuildStepFailed` when the compile
    /// step fails, and any `build` error.
    pub fn run(
        &self,
        source: &str,
        options: &BuildOptions,
        extra_args: &[String],
    ) -> Result<ExitStatus> {
        let prepared = self.prepare(source, options)?;
        let command = Self::run_command(&prepared)?;
        let image = self.compose(&prepared, options)?;
        let image = self
            .autobuilder
            .maybe_build(&prepared.manifest, &image)?
            .unwrap_or(image);
        let status = self.execute(&image, command, extra_args, options)?;
        release_after_exit(prepared.tree);
        Ok(status)
    }

    /// Builds the app and runs `command` in it, ignoring the manifest's commands.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::Config` if `command` is empty, and any `build` error.
    pub fn exec(
        &self,
        source: &str,
        options: &BuildOptions,
        command: &[String],
    ) -> Result<ExitStatus> {
        if command.is_empty() {
            return Err(RunaError::Config {
                message: "exec requires a command".into(),
            });
        }
        let prepared = self.prepare(source, options)?;
        let image = self.compose(&prepared, options)?;
        let status = self.execute(&image, command.to_vec(), &[], options)?;
        release_after_exit(prepared.tree);
        Ok(status)
    }

    /// Builds the app and runs its test command with `extra_args` appended.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::NoTestCommand` before composing anything when the
    /// manifest has no test command, and any `build` error.
    pub fn test(
        &self,
        source: &str,
        options: &BuildOptions,
        extra_args: &[String],
    ) -> Result<ExitStatus> {
        let prepared = self.prepare(source, options)?;
        let command = prepared
            .manifest
            .test_argv()?
            .ok_or(RunaError::NoTestCommand)?;
        let image = self.compose(&prepared, options)?;
        let status = self.execute(&image, command, extra_args, options)?;
        release_after_exit(prepared.tree);
        Ok(status)
    }

    /// Writes a minimal manifest into `dir`, creating the directory if needed.
    ///
    /// The runtime is `builder_image` when given, otherwise the detected one,
    /// otherwise the configured default. Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::UnknownRuntime` for a runtime not in the table and
    /// `RunaError::SourceInvalid` if a manifest exists and `force` is unset.
    pub fn init(&self, dir: &Path, builder_image: Option<&str>, force: bool) -> Result<PathBuf> {
        let path = manifest::manifest_path(dir, &self.config.manifest_file);
        if path.exists() && !force {
            return Err(RunaError::SourceInvalid {
                path,
                reason: format!(
                    "{} already exists (use --force to overwrite)",
                    self.config.manifest_file
                ),
            });
        }

        let manifest = match builder_image {
            Some(name) => {
                let _ = self.table.runtime(name)?;
                AppManifest::for_runtime(name)
            }
            None if dir.is_dir() => {
                detect::synthesize(dir, &self.detectors, &self.config.default_runtime)
            }
            None => AppManifest::for_runtime(&self.config.default_runtime),
        };
        manifest::write(&manifest, dir, &self.config.manifest_file)
    }

    fn prepare(&self, source: &str, options: &BuildOptions) -> Result<Prepared> {
        let tree = source::resolve(source, &self.config.git_bin)?;
        let manifest = self.establish_manifest(&tree, options)?;
        let runtime = self.table.select(&manifest)?.clone();
        let base = ImageRef::new(&runtime.image);
        Ok(Prepared {
            tree,
            manifest,
            runtime,
            base,
        })
    }

    fn establish_manifest(&self, tree: &WorkingTree, options: &BuildOptions) -> Result<AppManifest> {
        let loaded = manifest::load(tree.root(), &self.config.manifest_file)?;
        let mut manifest = match (loaded, &options.builder_image) {
            (Some(manifest), _) => manifest,
            (None, Some(name)) => AppManifest::for_runtime(name),
            (None, None) => detect::detect(tree.root(), &self.detectors).ok_or_else(|| {
                RunaError::SourceInvalid {
                    path: tree.root().to_path_buf(),
                    reason: format!(
                        "no {} and no recognizable app (pass --builder-image)",
                        self.config.manifest_file
                    ),
                }
            })?,
        };
        if let Some(name) = &options.builder_image {
            manifest.builder_image = Some(name.clone());
        }
        Ok(manifest)
    }

    fn run_command(prepared: &Prepared) -> Result<Vec<String>> {
        if let Some(argv) = prepared.manifest.run_argv()? {
            return Ok(argv);
        }
        prepared
            .runtime
            .compile
            .as_ref()
            .and_then(|step| step.default_run_command.clone())
            .ok_or_else(|| RunaError::NoRunCommand {
                runtime: prepared.runtime.name.clone(),
            })
    }

    fn compose(&self, prepared: &Prepared, options: &BuildOptions) -> Result<ComposedImage> {
        self.compositor
            .compose(&prepared.base, prepared.tree.root(), options.tag.as_deref())
    }

    fn execute(
        &self,
        image: &ComposedImage,
        command: Vec<String>,
        extra_args: &[String],
        options: &BuildOptions,
    ) -> Result<ExitStatus> {
        let request = ExecutionRequest::new(image.image(), command, &image.app_path)
            .with_extra_args(extra_args.to_vec())
            .with_tty(options.tty);
        self.executor.run(&request)
    }
}

/// Releases a working tree once its container has exited.
///
/// The container's exit status is the invocation's result, so a failed
/// cleanup is only logged.
fn release_after_exit(tree: WorkingTree) {
    let root = tree.root().to_path_buf();
    if let Err(e) = tree.release() {
        tracing::warn!(tree = %root.display(), error = %e, "failed to remove working tree");
    }
}
