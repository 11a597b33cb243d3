//! Language detection and manifest synthesis.
//!
//! Each supported runtime contributes a [`Detector`]. Synthesis walks the
//! detector set in priority order and takes the first match.

use std::path::Path;

use runa_common::config::{RunaConfig, RuntimeSpec};

use crate::manifest::AppManifest;

/// A strategy that recognizes apps written for one runtime.
pub trait Detector: Send + Sync {
    /// Runtime name placed in the synthesized manifest.
    fn runtime(&self) -> &str;

    /// Whether the tree rooted at `root` looks like an app for this runtime.
    fn matches(&self, root: &Path) -> bool;
}

/// Detector driven by marker file names and file extensions at the tree root.
#[derive(Debug, Clone)]
pub struct MarkerDetector {
    runtime: String,
    markers: Vec<String>,
    extensions: Vec<String>,
}

impl MarkerDetector {
    /// Creates a detector for `runtime`.
    #[must_use]
    pub fn new(runtime: impl Into<String>, markers: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            runtime: runtime.into(),
            markers,
            extensions,
        }
    }

    /// Builds the detector for one runtime table entry.
    #[must_use]
    pub fn from_spec(spec: &RuntimeSpec) -> Self {
        Self::new(spec.name.clone(), spec.markers.clone(), spec.extensions.clone())
    }

    fn has_marker(&self, root: &Path) -> bool {
        self.markers.iter().any(|m| root.join(m).is_file())
    }

    fn has_extension(&self, root: &Path) -> bool {
        if self.extensions.is_empty() {
            return false;
        }
        let Ok(entries) = std::fs::read_dir(root) else {
            return false;
        };
        entries.filter_map(std::result::Result::ok).any(|entry| {
            let path = entry.path();
            path.is_file()
                && path.extension().is_some_and(|ext| {
                    self.extensions
                        .iter()
                        .any(|wanted| ext.eq_ignore_ascii_case(wanted.as_str()))
                })
        })
    }
}

impl Detector for MarkerDetector {
    fn runtime(&self) -> &str {
        &self.runtime
    }

    fn matches(&self, root: &Path) -> bool {
        self.has_marker(root) || self.has_extension(root)
    }
}

/// Builds the detector set from the runtime table, preserving its order.
///
/// Runtimes without markers or extensions are selectable only explicitly and
/// contribute no detector.
#[must_use]
pub fn detectors_from_config(config: &RunaConfig) -> Vec<Box<dyn Detector>> {
    config
        .runtimes
        .iter()
        .filter(|spec| !spec.markers.is_empty() || !spec.extensions.is_empty())
        .map(|spec| Box::new(MarkerDetector::from_spec(spec)) as Box<dyn Detector>)
        .collect()
}

/// Returns a manifest for the first detector that matches, if any.
#[must_use]
pub fn detect(root: &Path, detectors: &[Box<dyn Detector>]) -> Option<AppManifest> {
    let found = detectors.iter().find(|d| d.matches(root))?;
    tracing::info!(runtime = found.runtime(), root = %root.display(), "detected runtime");
    Some(AppManifest::for_runtime(found.runtime()))
}

/// Synthesizes a manifest, falling back to `default_runtime` when nothing matches.
///
/// The result only ever has `builder_image` set.
#[must_use]
pub fn synthesize(
    root: &Path,
    detectors: &[Box<dyn Detector>],
    default_runtime: &str,
) -> AppManifest {
    detect(root, detectors).unwrap_or_else(|| {
        tracing::info!(runtime = default_runtime, "no language detected, using default");
        AppManifest::for_runtime(default_runtime)
    })
}
