//! Compile step for runtimes whose apps must be built before running.
//!
//! The compile command runs in a named container started from the composed
//! image. On success the container is committed back onto the image's tag so
//! the subsequent run sees the build output.

use runa_app::manifest::AppManifest;
use runa_common::error::{Result, RunaError};
use runa_common::types::ContainerName;
use runa_image::compose::ComposedImage;
use runa_image::selector::RuntimeTable;

use crate::exec::{ExecutionRequest, Executor};

/// Runs configured compile steps.
#[derive(Clone)]
pub struct AutoBuilder {
    executor: Executor,
    table: RuntimeTable,
}

impl AutoBuilder {
    /// Creates an auto-builder using the compile steps in `table`.
    #[must_use]
    pub const fn new(executor: Executor, table: RuntimeTable) -> Self {
        Self { executor, table }
    }

    /// Compiles the app inside `image` if its runtime has a compile step.
    ///
    /// Returns `None` when the runtime needs no compilation.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::BuildStepFailed` if the compile container cannot
    /// start, exits non-zero, or cannot be committed.
    pub fn maybe_build(
        &self,
        manifest: &AppManifest,
        image: &ComposedImage,
    ) -> Result<Option<ComposedImage>> {
        let Some(name) = manifest.builder_image.as_deref() else {
            return Ok(None);
        };
        let runtime = self.table.runtime(name)?;
        let Some(step) = &runtime.compile else {
            return Ok(None);
        };

        let failed = |reason: String| RunaError::BuildStepFailed {
            runtime: name.to_owned(),
            reason,
        };
        let request = ExecutionRequest::new(image.image(), step.command.clone(), &image.app_path)
            .with_env(step.env.clone());
        let container = ContainerName::generate();
        tracing::info!(runtime = name, tag = %image.tag, "running compile step");

        let outcome = self
            .executor
            .run_as(&container, &request, false)
            .map_err(|e| failed(e.to_string()))
            .and_then(|status| {
                if status.success() {
                    Ok(())
                } else {
                    Err(failed(format!("compile command exited with {status}")))
                }
            })
            .and_then(|()| {
                self.executor
                    .backend()
                    .commit(&container, &image.tag)
                    .map_err(|e| failed(e.to_string()))
            });

        if let Err(e) = self.executor.backend().remove(&container) {
            tracing::warn!(container = %container, error = %e, "failed to remove compile container");
        }
        outcome?;

        tracing::info!(runtime = name, tag = %image.tag, "compile step finished");
        Ok(Some(image.clone()))
    }
}
