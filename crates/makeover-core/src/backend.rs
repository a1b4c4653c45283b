//! The external image generation backend, as seen by the composition engine.

use crate::error::Result;
use crate::image::{Artifact, ImageRef};
use crate::slot::GenerationInputs;
use async_trait::async_trait;

/// Asynchronous image generation service.
///
/// Both calls either return exactly one artifact or fail with a
/// `MakeoverError::Backend` describing the cause. Calls are not cancellable;
/// the composition engine discards results that arrive for an abandoned
/// session instead.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Combines the portrait, style elements and optional vibe into a new image.
    async fn generate_composite(&self, inputs: &GenerationInputs) -> Result<Artifact>;

    /// Applies a natural-language edit to a previously generated image.
    async fn generate_adjustment(&self, source: &ImageRef, instruction: &str) -> Result<Artifact>;
}
