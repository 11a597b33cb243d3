//! # runa-image
//!
//! Container image composition for runa.
//!
//! Handles:
//! - **Selector**: Runtime name to pinned base image lookup.
//! - **Context**: Deterministic build contexts holding the app tree.
//! - **Compose**: Layering an app tree onto a base image under a tag.
//! - **Builder**: The image builder seam and its `docker build` implementation.
//! - **Hashing**: SHA-256 content addressing.
//! - **Layers**: Unpacking saved images to inspect their filesystem.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod compose;
pub mod context;
pub mod hash;
pub mod layer;
pub mod selector;
