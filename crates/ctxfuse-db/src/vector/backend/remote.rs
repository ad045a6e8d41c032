//! Pinecone-compatible REST backend.
//!
//! Speaks the data-plane JSON API of an index host:
//!
//! | Operation | Route | Body |
//! |-----------|-------|------|
//! | query | `POST /query` | `vector`, `sparseVector`, `topK`, `namespace`, `filter`, `includeMetadata` |
//! | upsert | `POST /vectors/upsert` | `vectors[]`, `namespace` |
//! | delete | `POST /vectors/delete` | `deleteAll` or `ids`, `namespace` |
//! | stats | `POST /describe_index_stats` | `{}` |
//!
//! Every call carries the configured timeout. A timeout surfaces as
//! [`DbError::Timeout`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use ctxfuse_utils::{HttpClient, HttpClientConfig};

use super::super::config::VectorIndexConfig;
use super::super::metadata::ChunkMetadata;
use super::super::sparse::SparseVector;
use super::super::traits::{
    DeleteScope, VectorIndexBackend, VectorMatch, VectorMetric, VectorQuery, VectorRecord,
};
use crate::error::{DbError, DbResult};

/// Maximum vectors per upsert request accepted by the service.
const UPSERT_BATCH_SIZE: usize = 100;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_vector: Option<&'a SparseVector>,
    top_k: usize,
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_values: Option<&'a SparseVector>,
    metadata: &'a ChunkMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    vectors: Vec<WireVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBody<'a> {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delete_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

// ============================================================================
// RemoteVectorIndex
// ============================================================================

/// Client for a remote hybrid index host.
pub struct RemoteVectorIndex {
    client: HttpClient,
    dimension: usize,
    metric: VectorMetric,
    ordered_results: bool,
}

impl RemoteVectorIndex {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if no endpoint or API key is configured.
    pub fn open(config: &VectorIndexConfig) -> DbResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| DbError::config("index.endpoint is required for the remote backend"))?;

        let api_key = config.resolve_api_key().ok_or_else(|| {
            DbError::config(format!(
                "no API key for the remote index; set {}",
                config.api_key_env.as_deref().unwrap_or("PINECONE_API_KEY")
            ))
        })?;

        let http_config = HttpClientConfig::new(endpoint)
            .with_timeout(config.timeout())
            .with_max_retries(config.max_retries);
        let client = HttpClient::new(http_config, &[("Api-Key", api_key.as_str())])
            .map_err(|e| DbError::from_transport("connect", e))?;

        debug!("Opened RemoteVectorIndex at {}", endpoint);

        Ok(Self {
            client,
            dimension: config.dimension,
            metric: config.metric,
            ordered_results: config.ordered_results,
        })
    }
}

impl VectorIndexBackend for RemoteVectorIndex {
    fn query(&self, query: &VectorQuery<'_>) -> DbResult<Vec<VectorMatch>> {
        if query.vector.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: query.vector.len(),
            });
        }

        let body = QueryBody {
            vector: query.vector,
            sparse_vector: query.sparse_vector.filter(|s| !s.is_empty()),
            top_k: query.top_k,
            namespace: query.namespace,
            filter: query.filter.and_then(|f| f.to_json_filter()),
            include_metadata: query.include_metadata,
            include_values: false,
        };

        let resp: QueryResponse = self
            .client
            .post_json("query", &body)
            .map_err(|e| DbError::from_transport("query", e))?;

        trace!("Remote query returned {} matches", resp.matches.len());

        Ok(resp
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> DbResult<usize> {
        for record in records {
            if record.values.len() != self.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.values.len(),
                });
            }
        }

        let mut written = 0usize;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let body = UpsertBody {
                vectors: batch
                    .iter()
                    .map(|r| WireVector {
                        id: &r.id,
                        values: &r.values,
                        sparse_values: r.sparse_values.as_ref().filter(|s| !s.is_empty()),
                        metadata: &r.metadata,
                    })
                    .collect(),
                namespace,
            };

            let resp: UpsertResponse = self
                .client
                .post_json("vectors/upsert", &body)
                .map_err(|e| DbError::from_transport("upsert", e))?;
            written += resp.upserted_count;
        }

        debug!("Upserted {} vectors into '{}'", written, namespace);
        Ok(written)
    }

    fn delete(&self, namespace: &str, scope: DeleteScope) -> DbResult<()> {
        let body = match &scope {
            DeleteScope::All => DeleteBody {
                delete_all: true,
                ids: None,
                namespace,
            },
            DeleteScope::Ids(ids) => DeleteBody {
                delete_all: false,
                ids: Some(ids.as_slice()),
                namespace,
            },
        };

        let _: serde_json::Value = self
            .client
            .post_json("vectors/delete", &body)
            .map_err(|e| DbError::from_transport("delete", e))?;

        debug!("Deleted {:?} in '{}'", scope, namespace);
        Ok(())
    }

    fn len(&self, namespace: &str) -> DbResult<usize> {
        let resp: StatsResponse = self
            .client
            .post_json("describe_index_stats", &serde_json::json!({}))
            .map_err(|e| DbError::from_transport("describe_index_stats", e))?;

        Ok(resp
            .namespaces
            .get(namespace)
            .map(|s| s.vector_count)
            .unwrap_or(0))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }

    fn orders_results(&self) -> bool {
        self.ordered_results
    }
}
