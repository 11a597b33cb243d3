//! The app manifest (`Appfile`): model, parsing, and canonical serialization.
//!
//! The format is flat and line-oriented, one `key: value` pair per field.
//! A missing key means the field is unset; an empty value is rejected.

pub mod lexer;

use std::fmt;
use std::path::{Path, PathBuf};

use runa_common::error::{Result, RunaError};

use self::lexer::Line;
use crate::command;

/// Keys allowed in an Appfile, in canonical serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKey {
    /// `builder-image`
    BuilderImage,
    /// `run-command`
    RunCommand,
    /// `test-command`
    TestCommand,
}

impl ManifestKey {
    /// All keys in canonical order.
    pub const ALL: [Self; 3] = [Self::BuilderImage, Self::RunCommand, Self::TestCommand];

    /// The key as written in the file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuilderImage => "builder-image",
            Self::RunCommand => "run-command",
            Self::TestCommand => "test-command",
        }
    }

    /// Parses a key as written in the file.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative description of an app.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppManifest {
    /// Runtime name the app is layered onto, e.g. `golang`.
    pub builder_image: Option<String>,
    /// Command line executed by `run`.
    pub run_command: Option<String>,
    /// Command line executed by `test`.
    pub test_command: Option<String>,
}

impl AppManifest {
    /// A manifest whose only set field is `builder_image`.
    #[must_use]
    pub fn for_runtime(name: impl Into<String>) -> Self {
        Self {
            builder_image: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, key: ManifestKey) -> Option<&str> {
        match key {
            ManifestKey::BuilderImage => self.builder_image.as_deref(),
            ManifestKey::RunCommand => self.run_command.as_deref(),
            ManifestKey::TestCommand => self.test_command.as_deref(),
        }
    }

    fn slot(&mut self, key: ManifestKey) -> &mut Option<String> {
        match key {
            ManifestKey::BuilderImage => &mut self.builder_image,
            ManifestKey::RunCommand => &mut self.run_command,
            ManifestKey::TestCommand => &mut self.test_command,
        }
    }

    /// Parses Appfile text. `path` is used only in error messages.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::InvalidManifest` for malformed lines, unknown or
    /// duplicate keys, empty values, and command lines with unbalanced quotes.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut manifest = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let invalid = |message: String| RunaError::InvalidManifest {
                path: path.to_path_buf(),
                line: line_no,
                message,
            };

            let (key, value) = match lexer::classify(raw) {
                Some(Line::Blank) => continue,
                Some(Line::Entry { key, value }) => (key, value),
                None => return Err(invalid("expected 'key: value'".into())),
            };

            let key = ManifestKey::parse(key).ok_or_else(|| {
                invalid(format!(
                    "unknown key '{key}' (expected one of: builder-image, run-command, test-command)"
                ))
            })?;
            if value.is_empty() {
                return Err(invalid(format!("empty value for '{key}'")));
            }
            if key != ManifestKey::BuilderImage {
                let _ = command::split(value).map_err(|e| invalid(e.to_string()))?;
            }

            let slot = manifest.slot(key);
            if slot.is_some() {
                return Err(invalid(format!("duplicate key '{key}'")));
            }
            *slot = Some(value.to_owned());
        }

        Ok(manifest)
    }

    /// Canonical serialized form.
    ///
    /// One line per set field in canonical key order, joined by `\n`, with
    /// no trailing newline. Identical manifests always produce identical bytes.
    #[must_use]
    pub fn to_appfile_string(&self) -> String {
        ManifestKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| format!("{key}: {value}")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The run command split into arguments, if set.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::InvalidManifest` if the command line cannot be split.
    pub fn run_argv(&self) -> Result<Option<Vec<String>>> {
        self.argv(ManifestKey::RunCommand)
    }

    /// The test command split into arguments, if set.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::InvalidManifest` if the command line cannot be split.
    pub fn test_argv(&self) -> Result<Option<Vec<String>>> {
        self.argv(ManifestKey::TestCommand)
    }

    fn argv(&self, key: ManifestKey) -> Result<Option<Vec<String>>> {
        self.get(key)
            .map(|line| {
                command::split(line).map_err(|e| RunaError::InvalidManifest {
                    path: PathBuf::from(key.as_str()),
                    line: 0,
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Path of the manifest file inside `dir`.
#[must_use]
pub fn manifest_path(dir: &Path, manifest_file: &str) -> PathBuf {
    dir.join(manifest_file)
}

/// Reads the manifest from the root of a working tree.
///
/// Returns `Ok(None)` when the tree has no manifest file.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(root: &Path, manifest_file: &str) -> Result<Option<AppManifest>> {
    let path = manifest_path(root, manifest_file);
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no manifest file");
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| RunaError::Io {
        path: path.clone(),
        source: e,
    })?;
    let manifest = AppManifest::parse(&content, &path)?;
    tracing::info!(
        path = %path.display(),
        builder_image = ?manifest.builder_image,
        "loaded manifest"
    );
    Ok(Some(manifest))
}

/// Writes the canonical form of `manifest` to `dest_dir`, creating the
/// directory if needed. Returns the path written.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write(manifest: &AppManifest, dest_dir: &Path, manifest_file: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dest_dir).map_err(|e| RunaError::Io {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;
    let path = manifest_path(dest_dir, manifest_file);
    std::fs::write(&path, manifest.to_appfile_string()).map_err(|e| RunaError::Io {
        path: path.clone(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "wrote manifest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPFILE: &str = "Appfile";

    fn parse(content: &str) -> Result<AppManifest> {
        AppManifest::parse(content, Path::new(APPFILE))
    }

    #[test]
    fn parse_full_manifest() {
        let manifest = parse(
            "builder-image: busybox\nrun-command: echo hello\ntest-command: echo ran-tests\n",
        )
        .expect("parse");
        assert_eq!(manifest.builder_image.as_deref(), Some("busybox"));
        assert_eq!(manifest.run_command.as_deref(), Some("echo hello"));
        assert_eq!(manifest.test_command.as_deref(), Some("echo ran-tests"));
    }

    #[test]
    fn parse_absent_keys_are_unset() {
        let manifest = parse("builder-image: golang").expect("parse");
        assert_eq!(manifest, AppManifest::for_runtime("golang"));
        assert!(manifest.run_command.is_none());
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let manifest = parse("# my app\n\nbuilder-image: node\n").expect("parse");
        assert_eq!(manifest.builder_image.as_deref(), Some("node"));
    }

    #[test]
    fn parse_unknown_key_reports_line() {
        let err = parse("builder-image: golang\nrun_command: ./app").unwrap_err();
        assert!(matches!(err, RunaError::InvalidManifest { line: 2, .. }), "{err}");
    }

    #[test]
    fn parse_duplicate_key_is_error() {
        let err = parse("builder-image: golang\nbuilder-image: node").unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn parse_empty_value_is_error() {
        assert!(parse("run-command:").is_err());
    }

    #[test]
    fn parse_malformed_line_is_error() {
        assert!(parse("just some words").is_err());
    }

    #[test]
    fn parse_unbalanced_quote_in_command_is_error() {
        assert!(parse("run-command: echo 'oops").is_err());
    }

    #[test]
    fn serialize_single_field_has_no_trailing_newline() {
        assert_eq!(
            AppManifest::for_runtime("golang").to_appfile_string(),
            "builder-image: golang"
        );
    }

    #[test]
    fn serialize_uses_canonical_order() {
        let manifest = AppManifest {
            builder_image: Some("busybox".into()),
            run_command: Some("echo hello".into()),
            test_command: Some("echo ran-tests".into()),
        };
        assert_eq!(
            manifest.to_appfile_string(),
            "builder-image: busybox\nrun-command: echo hello\ntest-command: echo ran-tests"
        );
    }

    #[test]
    fn serialize_then_parse_is_identity() {
        let manifest = AppManifest {
            builder_image: Some("python".into()),
            run_command: None,
            test_command: Some("pytest -q".into()),
        };
        let text = manifest.to_appfile_string();
        assert_eq!(parse(&text).expect("parse"), manifest);
        assert_eq!(parse(&text).expect("parse").to_appfile_string(), text);
    }

    #[test]
    fn run_argv_splits_command() {
        let manifest = parse("builder-image: busybox\nrun-command: echo \"a b\" c").expect("parse");
        assert_eq!(
            manifest.run_argv().expect("argv"),
            Some(vec!["echo".to_owned(), "a b".to_owned(), "c".to_owned()])
        );
        assert_eq!(manifest.test_argv().expect("argv"), None);
    }

    #[test]
    fn load_missing_manifest_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load(dir.path(), APPFILE).expect("load").is_none());
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = AppManifest::for_runtime("golang");
        let path = write(&manifest, dir.path(), APPFILE).expect("write");

        assert_eq!(std::fs::read(&path).expect("read"), b"builder-image: golang");
        assert_eq!(load(dir.path(), APPFILE).expect("load"), Some(manifest));
    }

    #[test]
    fn write_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("new").join("app");
        let _ = write(&AppManifest::for_runtime("node"), &nested, APPFILE).expect("write");
        assert!(nested.join(APPFILE).is_file());
    }
}
