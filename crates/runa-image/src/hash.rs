//! SHA-256 content addressing.
//!
//! Build contexts and image layers are identified by their digest.

use std::io::Read;
use std::path::Path;

use runa_common::error::{Result, RunaError};
use runa_common::types::Sha256Hash;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> Sha256Hash {
    Sha256Hash::from_digest(&Sha256::digest(data).into())
}

/// Computes the SHA-256 hash of a file, streaming its contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| RunaError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Sha256Hash::from_digest(&hasher.finalize().into()))
}
