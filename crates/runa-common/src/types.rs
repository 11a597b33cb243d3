//! Domain primitive types used across the runa workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CONTAINER_NAME_PREFIX, SHA256_HEX_LENGTH};

/// Reference to a container image (`name[:tag]` or digest form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    /// Creates an image reference from a string value.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name given to a container started by runa.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerName(String);

impl ContainerName {
    /// Creates a container name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generates a unique container name with the runa prefix.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{CONTAINER_NAME_PREFIX}{}",
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 hash digest used for content addressing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Hex-encodes a raw 32-byte digest.
    #[must_use]
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(digest.iter().fold(String::with_capacity(SHA256_HEX_LENGTH), |mut hex, b| {
            use fmt::Write as _;
            let _ = write!(hex, "{b:02x}");
            hex
        }))
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Returns the first `len` hex characters.
    #[must_use]
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Where a working tree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OriginKind {
    /// A directory on the local filesystem, used in place.
    Local,
    /// A repository cloned into a temporary directory.
    Remote,
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Exit status of a program that ran inside a container.
///
/// A non-zero status is a normal outcome, not an error of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitStatus(i32);

impl ExitStatus {
    /// Wraps a raw exit code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// The raw exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Whether the program exited with status zero.
    #[must_use]
    pub const fn success(self) -> bool {
        self.0 == 0
    }

    /// Exit code suitable for the current process.
    ///
    /// Codes outside `0..=255` (signals, platform oddities) collapse to 1.
    #[must_use]
    pub fn process_code(self) -> u8 {
        u8::try_from(self.0).unwrap_or(1)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit status {}", self.0)
    }
}
