//! Error types for ctxfuse-model.
//!
//! Errors name the model and, where relevant, the environment variable or
//! endpoint involved so the fix is obvious from the message alone.

use thiserror::Error;

/// Result type alias for ctxfuse-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in ctxfuse-model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Configuration errors
    // ========================================================================
    /// Embedding configuration is invalid.
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The API key environment variable is unset or empty.
    #[error("{}", format_missing_api_key(.provider, .env_var))]
    MissingApiKey { provider: String, env_var: String },

    // ========================================================================
    // Provider errors
    // ========================================================================
    /// Provider could not be reached or constructed.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// The embedding call did not finish within its timeout.
    #[error("Embedding request for model '{model_id}' timed out after {timeout_ms} ms")]
    Timeout { model_id: String, timeout_ms: u64 },

    // ========================================================================
    // Inference errors
    // ========================================================================
    /// Embedding generation failed.
    #[error("Embedding failed for model '{model_id}': {message}")]
    EmbeddingFailed { model_id: String, message: String },

    /// The service returned vectors of an unexpected length.
    #[error("Embedding dimension mismatch for model '{model_id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        model_id: String,
        expected: usize,
        actual: usize,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Whether the error came from a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout { .. })
    }

    /// Convert a transport error for the given model.
    pub fn from_transport(model_id: &str, err: ctxfuse_utils::UtilsError) -> Self {
        match err {
            ctxfuse_utils::UtilsError::Timeout { timeout_ms, .. } => ModelError::Timeout {
                model_id: model_id.to_string(),
                timeout_ms,
            },
            ctxfuse_utils::UtilsError::ClientBuild(reason) => ModelError::ProviderNotAvailable {
                provider: model_id.to_string(),
                reason,
            },
            other => ModelError::EmbeddingFailed {
                model_id: model_id.to_string(),
                message: other.to_string(),
            },
        }
    }
}

fn format_missing_api_key(provider: &str, env_var: &str) -> String {
    format!(
        "No API key for embedding provider '{provider}'.\n\n\
        Set the {env_var} environment variable, or point embedding.apiKeyEnv\n\
        in ~/.ctxfuse/config.yaml at a variable that holds the key."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_timeout_maps_to_timeout() {
        let err = ModelError::from_transport(
            "text-embedding-3-small",
            ctxfuse_utils::UtilsError::Timeout {
                url: "http://localhost/embeddings".to_string(),
                timeout_ms: 200,
            },
        );
        assert!(err.is_timeout());
        assert!(err.to_string().contains("200 ms"));
    }

    #[test]
    fn test_transport_status_maps_to_embedding_failed() {
        let err = ModelError::from_transport(
            "text-embedding-3-small",
            ctxfuse_utils::UtilsError::Status {
                url: "http://localhost/embeddings".to_string(),
                status: 401,
                body: "unauthorized".to_string(),
            },
        );
        assert!(matches!(err, ModelError::EmbeddingFailed { .. }));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_missing_api_key_message_names_variable() {
        let err = ModelError::MissingApiKey {
            provider: "openai".to_string(),
            env_var: "OPENAI_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
