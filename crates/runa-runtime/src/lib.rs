//! # runa-runtime
//!
//! Running apps inside containers built from composed images.
//!
//! Handles:
//! - **Backend**: The container backend seam and its `docker` implementation.
//! - **Exec**: Execution requests and the executor that runs them.
//! - **Autobuild**: In-container compile steps for compiled runtimes.
//! - **Cancel**: Killing the active container on interrupt.
//! - **Engine**: The `build`, `run`, `exec`, `test`, and `init` verbs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod autobuild;
pub mod backend;
pub mod cancel;
pub mod engine;
pub mod exec;
