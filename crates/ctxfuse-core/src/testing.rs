//! Test doubles for the engine's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ctxfuse_db::vector::{
    ChunkMetadata, DeleteScope, VectorIndexBackend, VectorMatch, VectorMetric, VectorQuery,
    VectorRecord,
};
use ctxfuse_db::{DbError, DbResult};

use crate::bm25::term_index;
use crate::embedding::EmbeddingBackend;
use crate::errors::FuseError;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric word adds 1 to a hashed bucket; the result is
/// L2-normalized, so texts sharing words have a high inner product.
pub(crate) struct HashEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` calls so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = term_index(&word.to_lowercase()) as usize % self.dimension;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl EmbeddingBackend for HashEmbedder {
    fn model_id(&self) -> &str {
        "hash-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, FuseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|t| self.vector(t)).collect())
    }
}

/// Embedder whose service is always down.
pub(crate) struct FailingEmbedder {
    pub(crate) timeout: bool,
}

impl EmbeddingBackend for FailingEmbedder {
    fn model_id(&self) -> &str {
        "failing-embedder"
    }

    fn dimension(&self) -> usize {
        8
    }

    fn embed_batch(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, FuseError> {
        if self.timeout {
            Err(FuseError::Timeout {
                operation: "embedding (failing-embedder)".to_string(),
                timeout_ms: 5,
            })
        } else {
            Err(FuseError::Embedding {
                reason: "connection refused".to_string(),
            })
        }
    }
}

/// What the last query asked for.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedQuery {
    pub(crate) top_k: usize,
    pub(crate) namespace: String,
    pub(crate) subject: Option<String>,
    pub(crate) dense: Vec<f32>,
    pub(crate) sparse_len: usize,
}

/// Index that answers every query with a fixed list of matches.
pub(crate) struct ScriptedIndex {
    matches: Vec<VectorMatch>,
    ordered: bool,
    fail: bool,
    pub(crate) last_query: Mutex<Option<RecordedQuery>>,
}

impl ScriptedIndex {
    /// Matches returned as given, in the given order.
    pub(crate) fn new(matches: Vec<VectorMatch>, ordered: bool) -> Self {
        Self {
            matches,
            ordered,
            fail: false,
            last_query: Mutex::new(None),
        }
    }

    /// Every call times out.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new(), true)
        }
    }

    pub(crate) fn recorded(&self) -> Option<RecordedQuery> {
        self.last_query.lock().ok().and_then(|q| q.clone())
    }
}

/// A match carrying chunk metadata.
pub(crate) fn scored(id: &str, score: f32, text: &str, source: &str) -> VectorMatch {
    VectorMatch::new(id, score).with_metadata(ChunkMetadata::new(text, source))
}

impl VectorIndexBackend for ScriptedIndex {
    fn query(&self, query: &VectorQuery<'_>) -> DbResult<Vec<VectorMatch>> {
        if self.fail {
            return Err(DbError::Timeout {
                operation: "query".to_string(),
                timeout_ms: 10,
            });
        }

        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(RecordedQuery {
                top_k: query.top_k,
                namespace: query.namespace.to_string(),
                subject: query.filter.and_then(|f| f.subject()).map(str::to_string),
                dense: query.vector.to_vec(),
                sparse_len: query.sparse_vector.map(|s| s.len()).unwrap_or(0),
            });
        }

        Ok(self
            .matches
            .iter()
            .filter(|m| match (query.filter, &m.metadata) {
                (Some(filter), Some(meta)) => filter.matches(meta),
                (Some(filter), None) => filter.is_empty(),
                (None, _) => true,
            })
            .cloned()
            .collect())
    }

    fn upsert(&self, _namespace: &str, records: &[VectorRecord]) -> DbResult<usize> {
        if self.fail {
            return Err(DbError::remote("upsert", "HTTP 503"));
        }
        Ok(records.len())
    }

    fn delete(&self, _namespace: &str, _scope: DeleteScope) -> DbResult<()> {
        Ok(())
    }

    fn len(&self, _namespace: &str) -> DbResult<usize> {
        Ok(self.matches.len())
    }

    fn dimension(&self) -> usize {
        8
    }

    fn metric(&self) -> VectorMetric {
        VectorMetric::DotProduct
    }

    fn orders_results(&self) -> bool {
        self.ordered
    }
}
