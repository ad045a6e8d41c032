//! HTTP embedding clients.
//!
//! One client type covers both supported wire shapes:
//!
//! - OpenAI-compatible: `POST {endpoint}/embeddings` with `{"model", "input"}`,
//!   answered by `{"data": [{"index", "embedding"}]}`.
//! - Ollama: `POST {endpoint}/api/embed` with `{"model", "input"}`, answered by
//!   `{"embeddings": [[...]]}`.
//!
//! Inputs are split into `batch_size` requests. Every vector returned is
//! checked against the configured dimension.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ctxfuse_utils::{HttpClient, HttpClientConfig};

use crate::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::error::{ModelError, ModelResult};
use crate::EmbeddingModel;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding model backed by a remote HTTP service.
#[derive(Debug)]
pub struct HttpEmbeddingModel {
    config: EmbeddingConfig,
    client: HttpClient,
}

impl HttpEmbeddingModel {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidConfig`] for a zero dimension or batch size
    /// - [`ModelError::MissingApiKey`] when the OpenAI provider has no key
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        if config.dimension == 0 {
            return Err(ModelError::InvalidConfig {
                message: "embedding.dimension must be greater than 0".to_string(),
            });
        }
        if config.batch_size == 0 {
            return Err(ModelError::InvalidConfig {
                message: "embedding.batchSize must be greater than 0".to_string(),
            });
        }

        let auth_header = match (config.provider, config.resolve_api_key()) {
            (_, Some(key)) => Some(format!("Bearer {}", key)),
            (EmbeddingProviderKind::OpenAi, None) => {
                return Err(ModelError::MissingApiKey {
                    provider: config.provider.to_string(),
                    env_var: config
                        .api_key_env
                        .clone()
                        .unwrap_or_else(|| "OPENAI_API_KEY".to_string()),
                });
            }
            (EmbeddingProviderKind::Ollama, None) => None,
        };
        let headers: Vec<(&str, &str)> = auth_header
            .iter()
            .map(|value| ("Authorization", value.as_str()))
            .collect();

        let http_config = HttpClientConfig::new(config.effective_endpoint())
            .with_timeout(config.timeout())
            .with_max_retries(config.max_retries);
        let client = HttpClient::new(http_config, &headers)
            .map_err(|e| ModelError::from_transport(&config.model_id, e))?;

        debug!(
            "Created {} embedding client for '{}' ({} dims) at {}",
            config.provider,
            config.model_id,
            config.dimension,
            config.effective_endpoint()
        );

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn embed_chunk(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.config.model_id,
            input: texts,
        };

        let vectors = match self.config.provider {
            EmbeddingProviderKind::OpenAi => {
                let resp: OpenAiResponse = self
                    .client
                    .post_json("embeddings", &request)
                    .map_err(|e| ModelError::from_transport(&self.config.model_id, e))?;
                order_openai_items(resp.data)
            }
            EmbeddingProviderKind::Ollama => {
                let resp: OllamaResponse = self
                    .client
                    .post_json("api/embed", &request)
                    .map_err(|e| ModelError::from_transport(&self.config.model_id, e))?;
                resp.embeddings
            }
        };

        check_vectors(
            &self.config.model_id,
            texts.len(),
            self.config.dimension,
            vectors,
        )
    }
}

impl EmbeddingModel for HttpEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            out.extend(self.embed_chunk(chunk)?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

/// The OpenAI shape does not promise response order; `index` does.
fn order_openai_items(mut items: Vec<OpenAiItem>) -> Vec<Vec<f32>> {
    items.sort_by_key(|item| item.index);
    items.into_iter().map(|item| item.embedding).collect()
}

fn check_vectors(
    model_id: &str,
    expected_count: usize,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
) -> ModelResult<Vec<Vec<f32>>> {
    if vectors.len() != expected_count {
        return Err(ModelError::EmbeddingFailed {
            model_id: model_id.to_string(),
            message: format!(
                "expected {} embeddings, service returned {}",
                expected_count,
                vectors.len()
            ),
        });
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(ModelError::DimensionMismatch {
            model_id: model_id.to_string(),
            expected: dimension,
            actual: bad.len(),
        });
    }

    Ok(vectors)
}
