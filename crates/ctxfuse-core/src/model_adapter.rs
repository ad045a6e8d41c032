//! Adapter layer for ctxfuse-model infrastructure.
//!
//! This module bridges ctxfuse-model implementations with ctxfuse-core's domain types.
//! It provides:
//!
//! - Error conversion from `ModelError` to `FuseError`
//! - A wrapper that implements the core `EmbeddingBackend` trait over a
//!   `ctxfuse_model::EmbeddingModel`
//!
//! ## Architecture
//!
//! ```text
//! ctxfuse-core domain code (pipeline, ingest)
//!        ↓
//!   model_adapter (this module) - wrapper + conversions
//!        ↓
//!     ctxfuse-model implementations (HTTP embedding clients)
//! ```

use ctxfuse_model::{EmbeddingConfig, EmbeddingModel, ModelError};

use crate::embedding::EmbeddingBackend;
use crate::errors::FuseError;

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a ctxfuse-model error to a ctxfuse-core error.
///
/// Configuration problems become `InvalidConfiguration`; timeouts keep their
/// own variant; everything else is an embedding service failure.
pub fn from_model_error(err: ModelError) -> FuseError {
    match err {
        ModelError::InvalidConfig { message } => FuseError::InvalidConfiguration {
            message: format!("embedding: {}", message),
            hint: "Check the embedding section of the config".to_string(),
        },

        ModelError::MissingApiKey { provider, env_var } => FuseError::InvalidConfiguration {
            message: format!("no API key for embedding provider {}", provider),
            hint: format!("Export {} or set embedding.apiKeyEnv", env_var),
        },

        ModelError::Timeout {
            model_id,
            timeout_ms,
        } => FuseError::Timeout {
            operation: format!("embedding ({})", model_id),
            timeout_ms,
        },

        ModelError::ProviderNotAvailable { provider, reason } => FuseError::Embedding {
            reason: format!("{} unavailable: {}", provider, reason),
        },

        ModelError::EmbeddingFailed { model_id, message } => FuseError::Embedding {
            reason: format!("{}: {}", model_id, message),
        },

        err @ ModelError::DimensionMismatch { .. } => FuseError::Embedding {
            reason: err.to_string(),
        },

        ModelError::Json(json_err) => FuseError::Embedding {
            reason: format!("malformed response: {}", json_err),
        },
    }
}

/// Extension trait to convert ctxfuse-model results.
pub trait IntoFuseResult<T> {
    fn into_fuse_result(self) -> Result<T, FuseError>;
}

impl<T> IntoFuseResult<T> for Result<T, ModelError> {
    fn into_fuse_result(self) -> Result<T, FuseError> {
        self.map_err(from_model_error)
    }
}

// ============================================================================
// Embedding Backend Wrapper
// ============================================================================

/// Wrapper around a ctxfuse-model embedding model.
pub struct ModelEmbeddingBackend {
    inner: Box<dyn EmbeddingModel>,
}

impl std::fmt::Debug for ModelEmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEmbeddingBackend")
            .field("model_id", &self.inner.model_id())
            .field("dimension", &self.inner.dimension())
            .finish()
    }
}

impl ModelEmbeddingBackend {
    pub fn new(model: Box<dyn EmbeddingModel>) -> Self {
        Self { inner: model }
    }

    /// Create the backend from configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, FuseError> {
        let model = ctxfuse_model::create_embedding_model(config).into_fuse_result()?;
        Ok(Self::new(model))
    }
}

impl EmbeddingBackend for ModelEmbeddingBackend {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, FuseError> {
        self.inner.embed_batch(inputs).into_fuse_result()
    }
}

/// Create an embedding backend from configuration.
pub fn create_embedding_backend(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingBackend>, FuseError> {
    Ok(Box::new(ModelEmbeddingBackend::from_config(config)?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedModel;

    impl EmbeddingModel for FixedModel {
        fn embed(&self, texts: &[&str]) -> ctxfuse_model::ModelResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_error_conversion_timeout() {
        let err = from_model_error(ModelError::Timeout {
            model_id: "text-embedding-3-small".to_string(),
            timeout_ms: 30_000,
        });
        assert!(err.is_timeout());
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("text-embedding-3-small"));
    }

    #[test]
    fn test_error_conversion_missing_key() {
        let err = from_model_error(ModelError::MissingApiKey {
            provider: "openai".to_string(),
            env_var: "OPENAI_API_KEY".to_string(),
        });
        assert!(err.is_caller_bug());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_error_conversion_service_failures() {
        let failed = from_model_error(ModelError::EmbeddingFailed {
            model_id: "m".to_string(),
            message: "HTTP 503".to_string(),
        });
        assert!(matches!(failed, FuseError::Embedding { .. }));

        let mismatch = from_model_error(ModelError::DimensionMismatch {
            model_id: "m".to_string(),
            expected: 1536,
            actual: 3072,
        });
        assert!(mismatch.is_infrastructure());
    }

    #[test]
    fn test_wrapper_delegates() {
        let backend = ModelEmbeddingBackend::new(Box::new(FixedModel));
        assert_eq!(backend.model_id(), "fixed");
        assert_eq!(backend.dimension(), 2);
        assert_eq!(backend.embed("abc").unwrap(), vec![3.0, 1.0]);

        let batch = backend
            .embed_batch(&["a".to_string(), "bb".to_string()])
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1][0], 2.0);
    }
}
