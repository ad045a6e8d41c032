//! Configuration types for ctxfuse.
//!
//! - [`RetrievalConfig`]: per-call tuning for `build_context`
//! - [`EngineConfig`]: everything needed to stand up an engine, usually
//!   loaded from `~/.ctxfuse/config.yaml`
//!
//! # Example YAML
//!
//! ```yaml
//! retrieval:
//!   alpha: 0.7
//!   topK: 10
//!   absoluteFloor: 0.3
//!   dedupThreshold: 0.85
//!   maxTokens: 3000
//!   namespace: econ-101
//! bm25:
//!   statePath: /var/lib/ctxfuse/bm25.bin
//! embedding:
//!   provider: openai
//!   modelId: text-embedding-3-small
//!   dimension: 1536
//! index:
//!   backend: remote
//!   endpoint: https://my-index.svc.pinecone.io
//!   dimension: 1536
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ctxfuse_db::vector::{VectorIndexConfig, VectorMetric};
use ctxfuse_model::EmbeddingConfig;

use crate::bm25::Bm25Config;
use crate::context::DEFAULT_MAX_TOKENS;
use crate::dedup::DEFAULT_DEDUP_THRESHOLD;
use crate::errors::FuseError;
use crate::filter::DEFAULT_ABSOLUTE_FLOOR;
use crate::hybrid::{validate_alpha, DEFAULT_ALPHA};
use crate::ingest::IngestConfig;

/// Default number of candidates requested from the index.
pub const DEFAULT_TOP_K: usize = 10;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

// ============================================================================
// RetrievalConfig
// ============================================================================

/// Per-call retrieval tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Dense weight in [0, 1]; the sparse half gets `1 - alpha`.
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Candidates requested from the index.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Lowest cutoff the adaptive filter may use.
    #[serde(default = "default_absolute_floor")]
    pub absolute_floor: f32,

    /// Jaccard similarity at or above which a chunk is a duplicate.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f32,

    /// Token budget for the assembled context.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Namespace used when the caller does not name one.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_alpha() -> f32 {
    DEFAULT_ALPHA
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_absolute_floor() -> f32 {
    DEFAULT_ABSOLUTE_FLOOR
}

fn default_dedup_threshold() -> f32 {
    DEFAULT_DEDUP_THRESHOLD
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            top_k: default_top_k(),
            absolute_floor: default_absolute_floor(),
            dedup_threshold: default_dedup_threshold(),
            max_tokens: default_max_tokens(),
            namespace: default_namespace(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_absolute_floor(mut self, absolute_floor: f32) -> Self {
        self.absolute_floor = absolute_floor;
        self
    }

    pub fn with_dedup_threshold(mut self, dedup_threshold: f32) -> Self {
        self.dedup_threshold = dedup_threshold;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Check per-call parameters.
    ///
    /// # Errors
    ///
    /// [`FuseError::InvalidParameter`] for alpha outside [0, 1], `top_k` or
    /// `max_tokens` of 0, a NaN floor, or a dedup threshold outside (0, 1].
    pub fn validate(&self) -> Result<(), FuseError> {
        validate_alpha(self.alpha)?;

        if self.top_k == 0 {
            return Err(FuseError::invalid_parameter("top_k", "must be greater than 0"));
        }

        if self.max_tokens == 0 {
            return Err(FuseError::invalid_parameter(
                "max_tokens",
                "must be greater than 0",
            ));
        }

        if self.absolute_floor.is_nan() {
            return Err(FuseError::invalid_parameter(
                "absolute_floor",
                "must be a number",
            ));
        }

        if !(self.dedup_threshold > 0.0 && self.dedup_threshold <= 1.0) {
            return Err(FuseError::invalid_parameter(
                "dedup_threshold",
                format!("must be within (0, 1], got {}", self.dedup_threshold),
            ));
        }

        Ok(())
    }

    /// Same checks as [`validate`](Self::validate), phrased as config-file
    /// errors, plus warnings for legal but odd values.
    fn validate_section(&self) -> Result<Vec<String>, FuseError> {
        if let Err(FuseError::InvalidParameter { name, message }) = self.validate() {
            return Err(FuseError::InvalidConfiguration {
                message: format!("retrieval.{} {}", camel_case(&name), message),
                hint: hint_for(&name).to_string(),
            });
        }

        let mut warnings = Vec::new();

        if self.top_k > 100 {
            warnings.push(format!(
                "retrieval.topK={} is very large; queries will be slow and the context noisy (recommended: 5-20)",
                self.top_k
            ));
        }

        if !(0.0..=1.0).contains(&self.absolute_floor) {
            warnings.push(format!(
                "retrieval.absoluteFloor={} is outside [0, 1]; check it matches the index's score range",
                self.absolute_floor
            ));
        }

        if self.namespace.trim().is_empty() {
            warnings.push("retrieval.namespace is blank".to_string());
        }

        Ok(warnings)
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn hint_for(name: &str) -> &'static str {
    match name {
        "alpha" => "Set alpha between 0.0 (lexical only) and 1.0 (dense only); recommended: 0.7",
        "top_k" => "Set topK to at least 1 (recommended: 10)",
        "max_tokens" => "Set maxTokens to at least 1 (recommended: 3000)",
        "dedup_threshold" => "Set dedupThreshold above 0.0 and at most 1.0 (recommended: 0.85)",
        _ => "Check the retrieval section of the config file",
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Engine configuration, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub bm25: Bm25Config,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: VectorIndexConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

impl EngineConfig {
    /// Load the configuration from `~/.ctxfuse/config.yaml`.
    ///
    /// Falls back to defaults when there is no home directory or no file.
    pub fn load_default() -> Result<Self, FuseError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FuseError::ConfigLoad`] if the file exists but cannot be read or parsed.
    /// Returns [`FuseError::InvalidConfiguration`] if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, FuseError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| FuseError::ConfigLoad(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_yaml_str(&content)
            .map_err(|e| match e {
                FuseError::ConfigLoad(msg) => {
                    FuseError::ConfigLoad(format!("Failed to parse {}: {}", path.display(), msg))
                }
                other => other,
            })
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, FuseError> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| FuseError::ConfigLoad(e.to_string()))?
        };

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Get the default config directory (`~/.ctxfuse`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ctxfuse"))
    }

    /// Get the default config file path (`~/.ctxfuse/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join("config.yaml"))
    }

    /// Validate every section, returning warnings for questionable values.
    ///
    /// # Errors
    ///
    /// [`FuseError::InvalidConfiguration`] for out-of-range retrieval
    /// parameters, invalid BM25 parameters, a zero batch size, or an index
    /// dimension that differs from the embedding dimension.
    pub fn validate(&self) -> Result<Vec<String>, FuseError> {
        let mut all_warnings = self.retrieval.validate_section()?;
        all_warnings.extend(self.bm25.validate()?);
        all_warnings.extend(self.ingest.validate()?);

        if self.embedding.dimension != self.index.dimension {
            return Err(FuseError::InvalidConfiguration {
                message: format!(
                    "embedding.dimension ({}) does not match index.dimension ({})",
                    self.embedding.dimension, self.index.dimension
                ),
                hint: "Both sections must use the embedding model's output dimension".to_string(),
            });
        }

        // Alpha scales the dense query vector; only an inner product keeps that scale.
        if self.index.metric != VectorMetric::DotProduct {
            return Err(FuseError::InvalidConfiguration {
                message: format!(
                    "index.metric must be dotproduct for hybrid scoring, got {}",
                    self.index.metric
                ),
                hint: "Set index.metric to dotproduct and store normalized embeddings".to_string(),
            });
        }

        if self.embedding.batch_size == 0 {
            return Err(FuseError::InvalidConfiguration {
                message: "embedding.batchSize cannot be 0".to_string(),
                hint: "Set batchSize to at least 1 (recommended: 64)".to_string(),
            });
        }

        if self.embedding.max_retries > 5 || self.index.max_retries > 5 {
            all_warnings.push(
                "maxRetries above 5 can hold a query for a long time when a service is down"
                    .to_string(),
            );
        }

        Ok(all_warnings)
    }
}
