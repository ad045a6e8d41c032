//! Vector index configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::traits::VectorMetric;

/// Default dense dimensionality, matching the default embedding model.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Which backend serves the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendKind {
    /// In-process index with optional JSONL persistence.
    #[default]
    Memory,
    /// Pinecone-compatible REST service.
    Remote,
}

impl std::fmt::Display for IndexBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for IndexBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "local" => Ok(Self::Memory),
            "remote" | "pinecone" => Ok(Self::Remote),
            _ => Err(format!(
                "Unknown index backend: '{}'. Use 'memory' or 'remote'.",
                s
            )),
        }
    }
}

/// Vector index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: IndexBackendKind,

    /// Dense dimensionality.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Dense similarity metric.
    #[serde(default)]
    pub metric: VectorMetric,

    /// Persistence directory for the memory backend (`None` = volatile).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Index host URL for the remote backend.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the remote API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries on transient failures (0 = fail fast).
    #[serde(default)]
    pub max_retries: u32,

    /// Whether the service returns matches sorted by descending score.
    #[serde(default = "default_ordered_results")]
    pub ordered_results: bool,
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_api_key_env() -> Option<String> {
    Some("PINECONE_API_KEY".to_string())
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_ordered_results() -> bool {
    true
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackendKind::default(),
            dimension: default_dimension(),
            metric: VectorMetric::default(),
            path: None,
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            max_retries: 0,
            ordered_results: default_ordered_results(),
        }
    }
}

impl VectorIndexConfig {
    /// Create an in-memory configuration with the given dimension.
    pub fn memory(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Create a remote configuration for the given host.
    pub fn remote(dimension: usize, endpoint: impl Into<String>) -> Self {
        Self {
            backend: IndexBackendKind::Remote,
            dimension,
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// Set the persistence path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the metric.
    pub fn with_metric(mut self, metric: VectorMetric) -> Self {
        self.metric = metric;
        self
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VectorIndexConfig::default();
        assert_eq!(config.backend, IndexBackendKind::Memory);
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.metric, VectorMetric::DotProduct);
        assert!(config.ordered_results);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(
            "Pinecone".parse::<IndexBackendKind>().unwrap(),
            IndexBackendKind::Remote
        );
        assert!("sqlite".parse::<IndexBackendKind>().is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"backend":"remote","endpoint":"https://idx.example","orderedResults":false,"timeoutMs":250}"#;
        let config: VectorIndexConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend, IndexBackendKind::Remote);
        assert_eq!(config.endpoint.as_deref(), Some("https://idx.example"));
        assert!(!config.ordered_results);
        assert_eq!(config.timeout_ms, 250);
    }
}
