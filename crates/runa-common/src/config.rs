//! Global configuration model for runa.
//!
//! The runtime table, the in-image app path, and the external tool binaries
//! are all carried here and injected into each component, so tests can
//! substitute their own values.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APP_PATH, DEFAULT_DOCKER_BIN, DEFAULT_GIT_BIN, DEFAULT_RUNTIME,
    DEFAULT_TAG_REPOSITORY, MANIFEST_FILE,
};
use crate::error::{Result, RunaError};

/// Root configuration for runa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunaConfig {
    /// Path inside the image where the app tree is placed.
    pub app_path: String,
    /// Manifest file name looked up at the working tree root.
    pub manifest_file: String,
    /// Runtime chosen by `init` when detection finds nothing.
    pub default_runtime: String,
    /// Repository used for default image tags.
    pub tag_repository: String,
    /// Container CLI binary.
    pub docker_bin: PathBuf,
    /// Version-control CLI binary.
    pub git_bin: PathBuf,
    /// Supported runtimes, in detection priority order.
    pub runtimes: Vec<RuntimeSpec>,
}

/// One entry of the runtime table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    /// Name used in the manifest's `builder-image` field.
    pub name: String,
    /// Pinned base image reference.
    pub image: String,
    /// File names whose presence at the tree root signals this runtime.
    #[serde(default)]
    pub markers: Vec<String>,
    /// File extensions (without dot) at the tree root that signal this runtime.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// In-container compile step run before `run`.
    #[serde(default)]
    pub compile: Option<CompileStep>,
}

/// Compile step for runtimes whose apps must be built before running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileStep {
    /// Command executed in the app directory.
    pub command: Vec<String>,
    /// Extra environment for the compile command.
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Command used by `run` when the manifest declares none.
    #[serde(default)]
    pub default_run_command: Option<Vec<String>>,
}

impl RuntimeSpec {
    fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            markers: Vec::new(),
            extensions: Vec::new(),
            compile: None,
        }
    }

    fn markers(mut self, markers: &[&str]) -> Self {
        self.markers = markers.iter().map(|&m| m.to_owned()).collect();
        self
    }

    fn extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|&e| e.to_owned()).collect();
        self
    }

    fn compile(mut self, step: CompileStep) -> Self {
        self.compile = Some(step);
        self
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|&s| s.to_owned()).collect()
}

/// The compiled-in runtime table.
#[must_use]
pub fn default_runtimes() -> Vec<RuntimeSpec> {
    vec![
        RuntimeSpec::new("golang", "golang:1.22")
            .markers(&["go.mod"])
            .extensions(&["go"])
            .compile(CompileStep {
                command: words(&["go", "build", "-o", "app", "."]),
                env: vec![("GO111MODULE".into(), "auto".into())],
                default_run_command: Some(words(&["./app"])),
            }),
        RuntimeSpec::new("rust", "rust:1.79")
            .markers(&["Cargo.toml"])
            .compile(CompileStep {
                command: words(&["cargo", "build", "--release"]),
                env: Vec::new(),
                default_run_command: None,
            }),
        RuntimeSpec::new("node", "node:20-alpine").markers(&["package.json"]),
        RuntimeSpec::new("python", "python:3.12-slim")
            .markers(&["requirements.txt", "pyproject.toml", "setup.py"])
            .extensions(&["py"]),
        RuntimeSpec::new("ruby", "ruby:3.3-slim").markers(&["Gemfile"]),
        RuntimeSpec::new("busybox", "busybox:1.36"),
    ]
}

impl Default for RunaConfig {
    fn default() -> Self {
        Self {
            app_path: DEFAULT_APP_PATH.into(),
            manifest_file: MANIFEST_FILE.into(),
            default_runtime: DEFAULT_RUNTIME.into(),
            tag_repository: DEFAULT_TAG_REPOSITORY.into(),
            docker_bin: PathBuf::from(DEFAULT_DOCKER_BIN),
            git_bin: PathBuf::from(DEFAULT_GIT_BIN),
            runtimes: default_runtimes(),
        }
    }
}

impl RunaConfig {
    /// Loads configuration from a JSON file, or the defaults when `path` is `None`.
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| RunaError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                serde_json::from_str::<Self>(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency of the configuration.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.runtimes.is_empty() {
            return Err(config_err("runtime table is empty"));
        }
        if !self.app_path.starts_with('/') {
            return Err(config_err(format!(
                "app_path must be absolute, got '{}'",
                self.app_path
            )));
        }
        if self.manifest_file.is_empty() || self.manifest_file.contains('/') {
            return Err(config_err(format!(
                "manifest_file must be a plain file name, got '{}'",
                self.manifest_file
            )));
        }
        let mut seen = HashSet::new();
        for runtime in &self.runtimes {
            if runtime.name.is_empty() || runtime.image.is_empty() {
                return Err(config_err("runtime entries need a name and an image"));
            }
            if !seen.insert(runtime.name.as_str()) {
                return Err(config_err(format!("duplicate runtime '{}'", runtime.name)));
            }
            if runtime
                .compile
                .as_ref()
                .is_some_and(|step| step.command.is_empty())
            {
                return Err(config_err(format!(
                    "runtime '{}' has an empty compile command",
                    runtime.name
                )));
            }
        }
        if self.runtime(&self.default_runtime).is_none() {
            return Err(config_err(format!(
                "default runtime '{}' is not in the runtime table",
                self.default_runtime
            )));
        }
        Ok(())
    }

    /// Looks up a runtime by name.
    #[must_use]
    pub fn runtime(&self, name: &str) -> Option<&RuntimeSpec> {
        self.runtimes.iter().find(|r| r.name == name)
    }
}

fn config_err(message: impl Into<String>) -> RunaError {
    RunaError::Config {
        message: message.into(),
    }
}
