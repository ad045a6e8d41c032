//! Dense encoder interface used by the engine.
//!
//! The production implementation is
//! [`ModelEmbeddingBackend`](crate::model_adapter::ModelEmbeddingBackend),
//! which wraps a `ctxfuse_model` HTTP client.

use crate::errors::FuseError;

/// Trait for dense embedding providers.
pub trait EmbeddingBackend: Send + Sync {
    /// Get the model ID this backend uses.
    fn model_id(&self) -> &str;

    /// Get the embedding dimension. Every vector returned has this length.
    fn dimension(&self) -> usize;

    /// Embed a batch of text inputs, one vector per input in order.
    fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, FuseError>;

    /// Embed a single text input.
    fn embed(&self, input: &str) -> Result<Vec<f32>, FuseError> {
        self.embed_batch(&[input.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| FuseError::Embedding {
                reason: "embed_batch returned empty results".to_string(),
            })
    }
}
