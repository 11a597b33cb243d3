//! System-wide constants and default values.

/// Path inside every composed image where the app tree is placed.
///
/// Also the working directory of every container runa starts, so run-time
/// commands find the code at the same location it was built into.
pub const DEFAULT_APP_PATH: &str = "/tmp/app";

/// File name of the app manifest at the root of a working tree.
pub const MANIFEST_FILE: &str = "Appfile";

/// Runtime used by `init` when no language signature matches.
pub const DEFAULT_RUNTIME: &str = "golang";

/// Repository part of the tag given to images composed without `-t`.
pub const DEFAULT_TAG_REPOSITORY: &str = "runa/app";

/// Number of digest hex characters used in a default tag.
pub const SHORT_DIGEST_LENGTH: usize = 12;

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Directory inside the build context that holds the app tree.
pub const CONTEXT_APP_DIR: &str = "app";

/// Name of the generated Dockerfile inside the build context.
pub const CONTEXT_DOCKERFILE: &str = "Dockerfile";

/// Version-control metadata directory excluded from build contexts.
pub const VCS_DIR: &str = ".git";

/// Prefix of every container name runa creates.
pub const CONTAINER_NAME_PREFIX: &str = "runa-";

/// Default container CLI binary.
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Default version-control CLI binary.
pub const DEFAULT_GIT_BIN: &str = "git";

/// Environment variable pointing at a JSON configuration file.
pub const CONFIG_ENV: &str = "RUNA_CONFIG";
