//! Resolution of app source references into local working trees.
//!
//! Local paths are used in place. Remote repository URLs are cloned with the
//! `git` CLI into a temporary directory owned by the returned [`WorkingTree`];
//! dropping the tree removes the checkout.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use runa_common::constants::{CONTEXT_APP_DIR, VCS_DIR};
use runa_common::error::{Result, RunaError};
use runa_common::types::OriginKind;
use tempfile::TempDir;

/// Supported source reference kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Directory on the local filesystem.
    Local(PathBuf),
    /// Repository fetched with `git clone`.
    Remote {
        /// Clone URL without the fragment.
        url: String,
        /// Branch or tag from a `#ref` fragment.
        reference: Option<String>,
    },
}

impl SourceRef {
    /// Classifies a source reference string.
    ///
    /// Anything with a URL scheme or in scp form (`user@host:path`) is remote.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        if is_remote(reference) {
            let (url, fragment) = match reference.rsplit_once('#') {
                Some((url, fragment)) if !fragment.is_empty() => (url, Some(fragment.to_owned())),
                Some((url, _)) => (url, None),
                None => (reference, None),
            };
            Self::Remote {
                url: url.to_owned(),
                reference: fragment,
            }
        } else {
            Self::Local(PathBuf::from(reference))
        }
    }
}

fn is_remote(reference: &str) -> bool {
    if reference.contains("://") {
        return true;
    }
    // scp-like syntax: user@host:path, with no path separator before the '@'
    reference.split_once('@').is_some_and(|(user, rest)| {
        !user.is_empty() && !user.contains('/') && rest.split_once(':').is_some_and(|(host, _)| !host.is_empty())
    })
}

/// A local directory holding an app tree.
///
/// Remote checkouts are removed when the tree is dropped or released.
/// Local trees are never modified or deleted.
#[derive(Debug)]
pub struct WorkingTree {
    root: PathBuf,
    origin: OriginKind,
    checkout: Option<TempDir>,
}

impl WorkingTree {
    /// Wraps an existing local directory.
    #[must_use]
    pub const fn local(root: PathBuf) -> Self {
        Self {
            root,
            origin: OriginKind::Local,
            checkout: None,
        }
    }

    /// Root directory of the app tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the tree is a local directory or a remote checkout.
    #[must_use]
    pub const fn origin(&self) -> OriginKind {
        self.origin
    }

    /// Removes the checkout now, reporting any failure.
    ///
    /// Dropping the tree has the same effect but ignores errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary checkout cannot be removed.
    pub fn release(self) -> Result<()> {
        if let Some(checkout) = self.checkout {
            let path = checkout.path().to_path_buf();
            checkout.close().map_err(|e| RunaError::Io {
                path: path.clone(),
                source: e,
            })?;
            tracing::debug!(path = %path.display(), "removed remote checkout");
        }
        Ok(())
    }
}

/// Resolves a source reference into a working tree.
///
/// # Errors
///
/// Returns `RunaError::SourceUnavailable` when the source cannot be fetched
/// or does not exist, and `RunaError::SourceInvalid` when it has no usable
/// app root.
pub fn resolve(reference: &str, git_bin: &Path) -> Result<WorkingTree> {
    match SourceRef::parse(reference) {
        SourceRef::Local(path) => resolve_local(reference, &path),
        SourceRef::Remote {
            url,
            reference: git_ref,
        } => clone_remote(&url, git_ref.as_deref(), git_bin),
    }
}

fn resolve_local(reference: &str, path: &Path) -> Result<WorkingTree> {
    if !path.exists() {
        return Err(RunaError::SourceUnavailable {
            reference: reference.to_owned(),
            reason: "path does not exist".into(),
        });
    }
    if !path.is_dir() {
        return Err(RunaError::SourceInvalid {
            path: path.to_path_buf(),
            reason: "not a directory".into(),
        });
    }
    let root = path.canonicalize().map_err(|e| RunaError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(root = %root.display(), "resolved local source");
    Ok(WorkingTree::local(root))
}

fn clone_remote(url: &str, git_ref: Option<&str>, git_bin: &Path) -> Result<WorkingTree> {
    let unavailable = |reason: String| RunaError::SourceUnavailable {
        reference: url.to_owned(),
        reason,
    };

    let checkout = tempfile::Builder::new()
        .prefix("runa-src-")
        .tempdir()
        .map_err(|e| unavailable(format!("cannot create temporary directory: {e}")))?;
    let root = checkout.path().join(CONTEXT_APP_DIR);

    let mut cmd = Command::new(git_bin);
    let _ = cmd
        .args(["clone", "--depth", "1", "--quiet"])
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    if let Some(git_ref) = git_ref {
        let _ = cmd.args(["--branch", git_ref]);
    }
    let _ = cmd.arg("--").arg(url).arg(&root);

    tracing::info!(url, git_ref, dest = %root.display(), "cloning remote source");
    let output = cmd
        .output()
        .map_err(|e| unavailable(format!("failed to run {}: {e}", git_bin.display())))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unavailable(format!(
            "git clone exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    if !has_app_content(&root)? {
        return Err(RunaError::SourceInvalid {
            path: root,
            reason: "repository contains no files".into(),
        });
    }

    Ok(WorkingTree {
        root,
        origin: OriginKind::Remote,
        checkout: Some(checkout),
    })
}

fn has_app_content(root: &Path) -> Result<bool> {
    let entries = std::fs::read_dir(root).map_err(|e| RunaError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    Ok(entries
        .filter_map(std::result::Result::ok)
        .any(|entry| entry.file_name() != VCS_DIR))
}
