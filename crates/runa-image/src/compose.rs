//! Image composition: layering an app tree onto a base runtime image.
//!
//! Composition is purely additive. The app tree becomes one new layer at
//! the app path and the base image's layers are reused unchanged.
//! Composing to an existing tag moves the tag to the new image.

use std::path::Path;
use std::sync::Arc;

use runa_common::constants::SHORT_DIGEST_LENGTH;
use runa_common::error::{Result, RunaError};
use runa_common::types::{ImageRef, Sha256Hash};

use crate::builder::ImageBuilder;
use crate::context::BuildContext;

/// The result of a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedImage {
    /// Tag the image was given.
    pub tag: String,
    /// Base image the app was layered onto.
    pub base: ImageRef,
    /// In-image path holding the app tree.
    pub app_path: String,
    /// Digest of the build context.
    pub context_digest: Sha256Hash,
}

impl ComposedImage {
    /// The composed image as an image reference.
    #[must_use]
    pub fn image(&self) -> ImageRef {
        ImageRef::new(&self.tag)
    }
}

/// Composes app trees onto base images through an [`ImageBuilder`].
#[derive(Clone)]
pub struct Compositor {
    builder: Arc<dyn ImageBuilder>,
    app_path: String,
    tag_repository: String,
}

impl Compositor {
    /// Creates a compositor placing apps at `app_path` and tagging untagged
    /// builds under `tag_repository`.
    #[must_use]
    pub fn new(
        builder: Arc<dyn ImageBuilder>,
        app_path: impl Into<String>,
        tag_repository: impl Into<String>,
    ) -> Self {
        Self {
            builder,
            app_path: app_path.into(),
            tag_repository: tag_repository.into(),
        }
    }

    /// Tag used when the caller supplies none: `<repository>:<short digest>`.
    #[must_use]
    pub fn default_tag(&self, context: &BuildContext) -> String {
        format!(
            "{}:{}",
            self.tag_repository,
            context.digest().short(SHORT_DIGEST_LENGTH)
        )
    }

    /// Layers the tree at `tree_root` onto `base` and tags the result.
    ///
    /// # Errors
    ///
    /// Returns `RunaError::CompositionFailed` if the context cannot be
    /// generated or the builder fails.
    pub fn compose(
        &self,
        base: &ImageRef,
        tree_root: &Path,
        tag: Option<&str>,
    ) -> Result<ComposedImage> {
        let context = BuildContext::generate(base, tree_root, &self.app_path).map_err(|e| {
            RunaError::CompositionFailed {
                tag: tag.unwrap_or("<default>").to_owned(),
                reason: e.to_string(),
            }
        })?;
        let tag = tag.map_or_else(|| self.default_tag(&context), str::to_owned);

        tracing::info!(
            %tag,
            %base,
            app_path = %self.app_path,
            files = context.file_count(),
            "composing image"
        );
        let image_id =
            self.builder
                .build(&context, &tag)
                .map_err(|e| RunaError::CompositionFailed {
                    tag: tag.clone(),
                    reason: e.to_string(),
                })?;
        tracing::info!(%tag, image_id, "image composed");

        Ok(ComposedImage {
            tag,
            base: base.clone(),
            app_path: self.app_path.clone(),
            context_digest: context.digest().clone(),
        })
    }
}
