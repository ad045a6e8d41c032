//! The query pipeline behind `build_context`.
//!
//! ```text
//! question ─┬─ embed ──────────┐
//!           └─ BM25 encode ────┴─ combine(alpha) ─ retrieve ─ adaptive filter ─ assemble
//! ```
//!
//! Embedding and sparse encoding run concurrently; everything after the
//! join is sequential.

use std::sync::Arc;
use std::time::Instant;

use ctxfuse_db::vector::VectorIndexBackend;

use crate::bm25::{encode, load_or_neutral, Bm25State, SharedBm25State};
use crate::config::{EngineConfig, RetrievalConfig};
use crate::context::{assemble, RetrievalResult};
use crate::db_adapter::open_index;
use crate::embedding::EmbeddingBackend;
use crate::errors::FuseError;
use crate::filter::adaptive_filter;
use crate::hybrid::combine;
use crate::ingest::Ingestor;
use crate::model_adapter::create_embedding_backend;
use crate::retriever::retrieve;

/// Hybrid retrieval engine.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ContextEngine {
    embedder: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn VectorIndexBackend>,
    bm25: SharedBm25State,
}

impl ContextEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn VectorIndexBackend>,
        bm25: SharedBm25State,
    ) -> Self {
        Self {
            embedder,
            index,
            bm25,
        }
    }

    /// Build an engine from configuration.
    ///
    /// A configured BM25 state file is loaded once here; if it is missing or
    /// corrupt the engine starts with neutral statistics.
    pub fn from_config(config: &EngineConfig) -> Result<Self, FuseError> {
        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        let embedder: Arc<dyn EmbeddingBackend> =
            Arc::from(create_embedding_backend(&config.embedding)?);
        let index = open_index(&config.index)?;

        let state = match &config.bm25.state_path {
            Some(path) => load_or_neutral(path, &config.bm25),
            None => Bm25State::neutral(&config.bm25),
        };
        tracing::debug!(
            "Engine ready: model={}, dimension={}, bm25 fitted={}",
            embedder.model_id(),
            index.dimension(),
            state.is_fitted()
        );

        Ok(Self::new(embedder, index, SharedBm25State::new(state)))
    }

    /// An ingestor writing to the same index and publishing into the same
    /// BM25 cell as this engine.
    pub fn ingestor(&self, config: &EngineConfig) -> Ingestor {
        Ingestor::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            self.bm25.clone(),
            config.bm25.clone(),
        )
        .with_config(config.ingest.clone())
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndexBackend> {
        &self.index
    }

    pub fn bm25(&self) -> &SharedBm25State {
        &self.bm25
    }

    /// Retrieve, filter and assemble context for `question`.
    ///
    /// A blank `namespace` means `config.namespace`. A blank question yields an
    /// empty result without calling out. So does a question nothing in the
    /// namespace clears the filter for.
    ///
    /// # Errors
    ///
    /// - [`FuseError::InvalidParameter`] for out-of-range `config` values
    /// - [`FuseError::Embedding`], [`FuseError::Retrieval`] or
    ///   [`FuseError::Timeout`] when a collaborator fails
    pub fn build_context(
        &self,
        question: &str,
        namespace: &str,
        subject_filter: Option<&str>,
        config: &RetrievalConfig,
    ) -> Result<RetrievalResult, FuseError> {
        config.validate()?;
        let namespace = if namespace.trim().is_empty() {
            config.namespace.as_str()
        } else {
            namespace
        };

        if question.trim().is_empty() {
            tracing::debug!("Empty question, returning empty context");
            return Ok(RetrievalResult::empty());
        }

        let start_time = Instant::now();
        let state = self.bm25.snapshot();

        let (dense, sparse) = rayon::join(
            || self.embedder.embed(question),
            || encode(&*state, question),
        );
        let dense = dense?;
        let encode_time_ms = start_time.elapsed().as_millis() as u64;

        let (dense, sparse) = combine(&dense, &sparse, config.alpha)?;

        let search_start = Instant::now();
        let candidates = retrieve(
            self.index.as_ref(),
            &dense,
            &sparse,
            subject_filter,
            namespace,
            config.top_k,
        )?;
        let search_time_ms = search_start.elapsed().as_millis() as u64;
        let retrieved = candidates.len();

        let filtered = adaptive_filter(candidates, config.absolute_floor);
        let kept = filtered.len();
        let result = assemble(filtered, config.dedup_threshold, config.max_tokens);

        tracing::info!(
            "Context built in {}ms (encode {}ms, search {}ms): {} retrieved, {} kept, {} chunks from '{}'",
            start_time.elapsed().as_millis(),
            encode_time_ms,
            search_time_ms,
            retrieved,
            kept,
            result.context_chunks.len(),
            namespace
        );

        Ok(result)
    }

    /// [`build_context`](Self::build_context), answering infrastructure
    /// failures with an empty result.
    ///
    /// Invalid parameters still fail.
    pub fn build_context_or_empty(
        &self,
        question: &str,
        namespace: &str,
        subject_filter: Option<&str>,
        config: &RetrievalConfig,
    ) -> Result<RetrievalResult, FuseError> {
        match self.build_context(question, namespace, subject_filter, config) {
            Err(e) if e.is_infrastructure() => {
                tracing::warn!("Retrieval failed, continuing without context: {}", e);
                Ok(RetrievalResult::empty())
            }
            other => other,
        }
    }
}
