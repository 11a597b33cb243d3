//! # runa-app
//!
//! Everything runa knows about an app before an image exists.
//!
//! Handles:
//! - **Source**: Resolving local paths and remote repositories into working trees.
//! - **Manifest**: Reading, validating, and writing the `Appfile`.
//! - **Detect**: Language detection strategies and manifest synthesis.
//! - **Command**: Splitting manifest command lines into argument vectors.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod command;
pub mod detect;
pub mod manifest;
pub mod source;
