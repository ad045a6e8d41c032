//! # ctxfuse-model
//!
//! Dense encoder layer for ctxfuse.
//!
//! This crate wraps the external embedding service that turns text into a
//! fixed-length float vector. It provides:
//!
//! - **[`EmbeddingModel`]**: the trait every embedding client implements
//! - **[`HttpEmbeddingModel`]**: OpenAI-compatible and Ollama HTTP clients
//! - **[`EmbeddingConfig`]**: the canonical embedding configuration
//!
//! ## Design Principles
//!
//! 1. **Production-only**: No mock implementations. Test doubles live in consuming crates.
//! 2. **Fixed dimensionality**: every vector is checked against the configured dimension.
//! 3. **Typed timeouts**: a request that exceeds its timeout fails with [`ModelError::Timeout`].
//!
//! ## Usage
//!
//! ```ignore
//! use ctxfuse_model::{create_embedding_model, EmbeddingConfig, EmbeddingModel};
//!
//! let config = EmbeddingConfig::default();
//! let model = create_embedding_model(&config)?;
//!
//! let embeddings = model.embed(&["What is opportunity cost?"])?;
//! assert_eq!(embeddings[0].len(), model.dimension());
//! ```

pub mod config;
pub mod error;

mod embedding;

pub use config::{EmbeddingConfig, EmbeddingProviderKind};
pub use embedding::HttpEmbeddingModel;
pub use error::{ModelError, ModelResult};

/// Default embedding model ID.
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "text-embedding-3-small";

/// Output dimensionality of the default model.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

// ============================================================================
// Embedding Model Trait
// ============================================================================

/// Trait for embedding models.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across threads.
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Generate embeddings for a batch of texts, one vector per input.
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Generate embeddings for owned strings.
    fn embed_batch(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        self.embed(&refs)
    }

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.embed(&[text])?
            .pop()
            .ok_or_else(|| ModelError::EmbeddingFailed {
                model_id: self.model_id().to_string(),
                message: "service returned no embedding".to_string(),
            })
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create an embedding model from configuration.
///
/// # Errors
///
/// Returns `ModelError` if the configuration is invalid or the API key is missing.
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    let model = HttpEmbeddingModel::new(config)?;
    Ok(Box::new(model))
}
