//! Builder image selection.
//!
//! Maps a manifest's runtime name to a pinned base image through a fixed
//! table. Unknown names are rejected instead of being used as image
//! references directly.

use runa_app::manifest::AppManifest;
use runa_common::config::{RunaConfig, RuntimeSpec};
use runa_common::error::{Result, RunaError};

/// Lookup table from runtime name to base image.
#[derive(Debug, Clone)]
pub struct RuntimeTable {
    runtimes: Vec<RuntimeSpec>,
}

impl RuntimeTable {
    /// Creates a table from explicit entries.
    #[must_use]
    pub const fn new(runtimes: Vec<RuntimeSpec>) -> Self {
        Self { runtimes }
    }

    /// Creates the table configured in `config`.
    #[must_use]
    pub fn from_config(config: &RunaConfig) -> Self {
        Self::new(config.runtimes.clone())
    }

    /// Looks up a runtime entry by name.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::UnknownRuntime` if the name is not in the table.
    pub fn runtime(&self, name: &str) -> Result<&RuntimeSpec> {
        self.runtimes
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RunaError::UnknownRuntime {
                name: name.to_owned(),
                known: self.names(),
            })
    }

    /// Selects the runtime entry, and with it the base image, for a manifest.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::InvalidManifest` when the manifest names no runtime
    /// and `RunaError::UnknownRuntime` when the name is not in the table.
    pub fn select(&self, manifest: &AppManifest) -> Result<&RuntimeSpec> {
        let name = manifest
            .builder_image
            .as_deref()
            .ok_or_else(|| RunaError::InvalidManifest {
                path: "builder-image".into(),
                line: 0,
                message: "manifest does not name a builder image".into(),
            })?;
        let spec = self.runtime(name)?;
        tracing::debug!(runtime = name, image = %spec.image, "selected builder image");
        Ok(spec)
    }

    fn names(&self) -> String {
        self.runtimes
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
