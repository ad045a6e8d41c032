//! Configuration types for ctxfuse-model.
//!
//! These are the canonical embedding settings; ctxfuse-core embeds this type in
//! its own config file rather than defining a duplicate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL_ID};

// ============================================================================
// EmbeddingProviderKind
// ============================================================================

/// Embedding provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint.
    #[default]
    OpenAi,
    /// Ollama `/api/embed` endpoint.
    Ollama,
}

impl EmbeddingProviderKind {
    /// Default base URL for the provider.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" | "azure" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(format!(
                "Unknown provider: '{}'. Use 'openai' or 'ollama'.",
                s
            )),
        }
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Model ID sent to the service (e.g., "text-embedding-3-small").
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Output dimensionality; fixed for the whole deployment.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Base URL. `None` uses the provider default.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries on transient failures (0 = fail fast).
    #[serde(default)]
    pub max_retries: u32,

    /// Maximum texts per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model_id: default_model_id(),
            dimension: default_dimension(),
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            max_retries: 0,
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Base URL the client talks to.
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
