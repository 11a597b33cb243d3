//! Deterministic build contexts.
//!
//! A build context is a tar archive holding a generated `Dockerfile` and the
//! app tree under `app/`. Entries are written in sorted path order with
//! zeroed timestamps and ownership, so identical trees always produce
//! byte-identical archives and the same digest.

use std::path::{Path, PathBuf};

use runa_common::constants::{CONTEXT_APP_DIR, CONTEXT_DOCKERFILE, VCS_DIR};
use runa_common::error::{Result, RunaError};
use runa_common::types::{ImageRef, Sha256Hash};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// An in-memory build context ready to hand to an image builder.
#[derive(Debug, Clone)]
pub struct BuildContext {
    base: ImageRef,
    app_path: String,
    archive: Vec<u8>,
    digest: Sha256Hash,
    files: usize,
}

impl BuildContext {
    /// Generates the context for layering `tree_root` onto `base` at `app_path`.
    ///
    /// The `.git` directory at the tree root is left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be walked or read.
    pub fn generate(base: &ImageRef, tree_root: &Path, app_path: &str) -> Result<Self> {
        let dockerfile = render_dockerfile(base, app_path);
        let mut builder = tar::Builder::new(Vec::new());
        builder.mode(tar::HeaderMode::Deterministic);

        let io_err = |path: &Path, e: std::io::Error| RunaError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        append_bytes(&mut builder, Path::new(CONTEXT_DOCKERFILE), dockerfile.as_bytes())
            .map_err(|e| io_err(tree_root, e))?;
        append_dir(&mut builder, Path::new(CONTEXT_APP_DIR)).map_err(|e| io_err(tree_root, e))?;

        let mut files = 0;
        let walker = walkdir::WalkDir::new(tree_root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == VCS_DIR));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(tree_root).to_path_buf();
                RunaError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            let relative = entry
                .path()
                .strip_prefix(tree_root)
                .map_err(|e| RunaError::Config {
                    message: format!("walked outside the tree root: {e}"),
                })?;
            let archive_path = Path::new(CONTEXT_APP_DIR).join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                append_dir(&mut builder, &archive_path).map_err(|e| io_err(entry.path(), e))?;
            } else if file_type.is_symlink() {
                let target =
                    std::fs::read_link(entry.path()).map_err(|e| io_err(entry.path(), e))?;
                append_symlink(&mut builder, &archive_path, &target)
                    .map_err(|e| io_err(entry.path(), e))?;
                files += 1;
            } else if file_type.is_file() {
                let data = std::fs::read(entry.path()).map_err(|e| io_err(entry.path(), e))?;
                let mode = file_mode(entry.path()).map_err(|e| io_err(entry.path(), e))?;
                append_file(&mut builder, &archive_path, &data, mode)
                    .map_err(|e| io_err(entry.path(), e))?;
                files += 1;
            } else {
                tracing::warn!(path = %entry.path().display(), "skipping special file");
            }
        }

        let archive = builder.into_inner().map_err(|e| io_err(tree_root, e))?;
        let digest = crate::hash::hash_bytes(&archive);
        tracing::debug!(%digest, files, bytes = archive.len(), "generated build context");

        Ok(Self {
            base: base.clone(),
            app_path: app_path.to_owned(),
            archive,
            digest,
            files,
        })
    }

    /// Base image the context builds on.
    #[must_use]
    pub const fn base(&self) -> &ImageRef {
        &self.base
    }

    /// In-image path the app tree is copied to.
    #[must_use]
    pub fn app_path(&self) -> &str {
        &self.app_path
    }

    /// Uncompressed tar archive bytes.
    #[must_use]
    pub fn archive(&self) -> &[u8] {
        &self.archive
    }

    /// SHA-256 of the archive.
    #[must_use]
    pub const fn digest(&self) -> &Sha256Hash {
        &self.digest
    }

    /// Number of files and symlinks taken from the app tree.
    #[must_use]
    pub const fn file_count(&self) -> usize {
        self.files
    }
}

/// Renders the Dockerfile that overlays the app tree onto `base`.
#[must_use]
pub fn render_dockerfile(base: &ImageRef, app_path: &str) -> String {
    let app_path = app_path.trim_end_matches('/');
    format!(
        "FROM {base}\nCOPY {CONTEXT_APP_DIR}/ {app_path}/\nWORKDIR {app_path}\n"
    )
}

fn header(entry_type: tar::EntryType, size: u64, mode: u32) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(mode);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

fn append_bytes(builder: &mut tar::Builder<Vec<u8>>, path: &Path, data: &[u8]) -> std::io::Result<()> {
    append_file(builder, path, data, FILE_MODE)
}

fn append_file(
    builder: &mut tar::Builder<Vec<u8>>,
    path: &Path,
    data: &[u8],
    mode: u32,
) -> std::io::Result<()> {
    let mut header = header(tar::EntryType::Regular, data.len() as u64, mode);
    builder.append_data(&mut header, path, data)
}

fn append_dir(builder: &mut tar::Builder<Vec<u8>>, path: &Path) -> std::io::Result<()> {
    let mut header = header(tar::EntryType::Directory, 0, DIR_MODE);
    builder.append_data(&mut header, path, std::io::empty())
}

fn append_symlink(
    builder: &mut tar::Builder<Vec<u8>>,
    path: &Path,
    target: &Path,
) -> std::io::Result<()> {
    let mut header = header(tar::EntryType::Symlink, 0, 0o777);
    builder.append_link(&mut header, path, target)
}

#[cfg(unix)]
fn file_mode(path: &Path) -> std::io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(std::fs::metadata(path)?.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> std::io::Result<u32> {
    Ok(FILE_MODE)
}

/// Lists the `(path, contents)` of regular files in an archive, in order.
///
/// # Errors
///
/// Returns an error if the archive is malformed.
pub fn list_files(archive: &[u8]) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    use std::io::Read;

    let io_err = |e| RunaError::Io {
        path: PathBuf::from("<build context>"),
        source: e,
    };
    let mut files = Vec::new();
    let mut reader = tar::Archive::new(archive);
    for entry in reader.entries().map_err(io_err)? {
        let mut entry = entry.map_err(io_err)?;
        if entry.header().entry_type() != tar::EntryType::Regular {
            continue;
        }
        let path = entry.path().map_err(io_err)?.into_owned();
        let mut data = Vec::new();
        let _ = entry.read_to_end(&mut data).map_err(io_err)?;
        files.push((path, data));
    }
    Ok(files)
}
