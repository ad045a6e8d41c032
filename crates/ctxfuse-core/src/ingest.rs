//! Ingestion of pre-chunked text into a namespace.
//!
//! One call:
//!
//! 1. embeds every chunk
//! 2. resolves ids, skipping chunks already present in the index
//! 3. adds the new chunks to the BM25 statistics and publishes them
//! 4. encodes every kept chunk as a BM25 document vector (in parallel)
//! 5. upserts in batches
//!
//! BM25 statistics accumulate across calls and namespaces.
//!
//! Parsing and chunking documents happens upstream.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use ctxfuse_db::vector::{
    ChunkMetadata, DeleteScope, SparseVector, VectorIndexBackend, VectorQuery, VectorRecord,
    UNKNOWN_SOURCE,
};

use crate::bm25::{save_state_file, Bm25Config, SharedBm25State, SparseEncoder};
use crate::db_adapter::NamespacedResult;
use crate::embedding::EmbeddingBackend;
use crate::errors::FuseError;

/// Score at or above which an existing vector is the same chunk.
pub const DEFAULT_EXACT_MATCH_THRESHOLD: f32 = 1.0;

/// Score at or above which an existing vector is replaced in place.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.99999;

/// Records per upsert call.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// A chunk of text ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    /// Caller-assigned id. `None` lets the ingestor pick one.
    #[serde(default)]
    pub id: Option<String>,

    pub text: String,

    #[serde(default = "default_source_file")]
    pub source_file: String,

    #[serde(default)]
    pub page_number: Option<u32>,

    /// Comma-separated subject tags.
    #[serde(default)]
    pub subjects: Option<String>,
}

fn default_source_file() -> String {
    UNKNOWN_SOURCE.to_string()
}

impl ChunkRecord {
    pub fn new(text: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            source_file: source_file.into(),
            page_number: None,
            subjects: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn with_subjects(mut self, subjects: impl Into<String>) -> Self {
        self.subjects = Some(subjects.into());
        self
    }

    fn metadata(&self, chunk_index: u32) -> ChunkMetadata {
        let mut meta = ChunkMetadata::new(self.text.clone(), self.source_file.clone())
            .with_chunk_index(chunk_index);
        if let Some(page) = self.page_number {
            meta = meta.with_page_number(page);
        }
        if let Some(subjects) = &self.subjects {
            meta = meta.with_subjects(subjects);
        }
        meta
    }
}

/// Ingestion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
    /// Look up each new chunk's nearest neighbour before writing it.
    #[serde(default = "default_check_duplicates")]
    pub check_duplicates: bool,

    /// Nearest-neighbour score at which the chunk is skipped.
    #[serde(default = "default_exact_match_threshold")]
    pub exact_match_threshold: f32,

    /// Nearest-neighbour score at which the neighbour's id is reused.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Records per upsert call.
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

fn default_check_duplicates() -> bool {
    true
}

fn default_exact_match_threshold() -> f32 {
    DEFAULT_EXACT_MATCH_THRESHOLD
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_upsert_batch_size() -> usize {
    DEFAULT_UPSERT_BATCH_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            check_duplicates: default_check_duplicates(),
            exact_match_threshold: default_exact_match_threshold(),
            similarity_threshold: default_similarity_threshold(),
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

impl IngestConfig {
    /// Validates the ingestion configuration, returning warnings for questionable values.
    pub fn validate(&self) -> Result<Vec<String>, FuseError> {
        let mut warnings = Vec::new();

        if self.upsert_batch_size == 0 {
            return Err(FuseError::InvalidConfiguration {
                message: "ingest.upsertBatchSize cannot be 0".to_string(),
                hint: "Set upsertBatchSize to at least 1 (recommended: 100)".to_string(),
            });
        }

        if self.similarity_threshold > self.exact_match_threshold {
            warnings.push(format!(
                "ingest.similarityThreshold ({}) > exactMatchThreshold ({}); near-identical chunks will always be skipped",
                self.similarity_threshold, self.exact_match_threshold
            ));
        }

        if self.upsert_batch_size > 1000 {
            warnings.push(format!(
                "ingest.upsertBatchSize={} is very large; remote indexes may reject the request",
                self.upsert_batch_size
            ));
        }

        Ok(warnings)
    }
}

/// Outcome of one [`Ingestor::ingest`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Records written, new and replaced.
    pub upserted: usize,
    /// Records that replaced a near-identical existing vector.
    pub replaced: usize,
    /// Chunks skipped because an identical vector already exists.
    pub skipped_identical: usize,
    /// Chunks skipped because their text is blank.
    pub skipped_empty: usize,
    /// Distinct terms in the published BM25 state.
    pub vocabulary_size: usize,
    pub embed_time_ms: u64,
    pub upsert_time_ms: u64,
    pub total_time_ms: u64,
}

enum IdDecision {
    Skip,
    Replace(String),
    Insert(String),
}

// ============================================================================
// Ingestor
// ============================================================================

/// Writes chunks into the vector index and keeps the BM25 state in step.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn VectorIndexBackend>,
    bm25: SharedBm25State,
    bm25_config: Bm25Config,
    config: IngestConfig,
}

impl Ingestor {
    /// `bm25` should be the same cell the query side reads from.
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn VectorIndexBackend>,
        bm25: SharedBm25State,
        bm25_config: Bm25Config,
    ) -> Self {
        Self {
            embedder,
            index,
            bm25,
            bm25_config,
            config: IngestConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bm25(&self) -> &SharedBm25State {
        &self.bm25
    }

    /// Index `chunks` into `namespace`.
    ///
    /// # Errors
    ///
    /// - [`FuseError::StateSave`] if the updated state cannot be persisted
    /// - [`FuseError::Embedding`] or [`FuseError::Timeout`] from the encoder
    /// - [`FuseError::Retrieval`] or [`FuseError::Timeout`] from the index
    pub fn ingest(&self, namespace: &str, chunks: &[ChunkRecord]) -> Result<IngestReport, FuseError> {
        let start = Instant::now();
        let mut report = IngestReport::default();

        let usable: Vec<&ChunkRecord> = chunks
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();
        report.skipped_empty = chunks.len() - usable.len();

        if usable.is_empty() {
            tracing::debug!("Nothing to ingest into '{}'", namespace);
            report.vocabulary_size = self.bm25.snapshot().vocabulary_size();
            return Ok(report);
        }

        // 1. Dense vectors
        let texts: Vec<String> = usable.iter().map(|c| c.text.clone()).collect();
        let embed_start = Instant::now();
        let dense = self.embedder.embed_batch(&texts)?;
        if dense.len() != texts.len() {
            return Err(FuseError::Embedding {
                reason: format!(
                    "expected {} vectors from {}, got {}",
                    texts.len(),
                    self.embedder.model_id(),
                    dense.len()
                ),
            });
        }
        report.embed_time_ms = embed_start.elapsed().as_millis() as u64;

        // 2. Ids
        let mut records: Vec<VectorRecord> = Vec::with_capacity(usable.len());
        let mut kept: Vec<&str> = Vec::with_capacity(usable.len());
        let mut new_docs: Vec<&str> = Vec::new();
        for (position, (chunk, values)) in usable.iter().zip(dense).enumerate() {
            let id = match self.resolve_id(namespace, chunk, &values, &records)? {
                IdDecision::Skip => {
                    report.skipped_identical += 1;
                    continue;
                }
                IdDecision::Replace(id) => {
                    report.replaced += 1;
                    id
                }
                IdDecision::Insert(id) => {
                    new_docs.push(&chunk.text);
                    id
                }
            };

            kept.push(&chunk.text);
            records.push(VectorRecord::new(id, values, chunk.metadata(position as u32)));
        }

        // 3. Lexical statistics. Replaced chunks are already counted.
        let state = if new_docs.is_empty() {
            self.bm25.snapshot()
        } else {
            let state = self.bm25.absorb(&new_docs, &self.bm25_config)?;
            if let Some(path) = &self.bm25_config.state_path {
                save_state_file(&state, path)?;
            }
            state
        };
        report.vocabulary_size = state.vocabulary_size();

        // 4. Sparse vectors
        let sparse: Vec<SparseVector> = kept
            .par_iter()
            .map(|text| state.encode_documents(text))
            .collect();
        let records: Vec<VectorRecord> = records
            .into_iter()
            .zip(sparse)
            .map(|(record, sparse)| record.with_sparse(sparse))
            .collect();

        // 5. Upsert
        let upsert_start = Instant::now();
        for batch in records.chunks(self.config.upsert_batch_size.max(1)) {
            report.upserted += self.index.upsert(namespace, batch).in_namespace(namespace)?;
        }
        report.upsert_time_ms = upsert_start.elapsed().as_millis() as u64;
        report.total_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Ingested {} chunks into '{}' in {}ms ({} replaced, {} identical skipped, {} empty skipped, vocabulary {})",
            report.upserted,
            namespace,
            report.total_time_ms,
            report.replaced,
            report.skipped_identical,
            report.skipped_empty,
            report.vocabulary_size
        );

        Ok(report)
    }

    /// Delete every vector in `namespace`.
    ///
    /// The BM25 state is left alone. Its statistics still count the deleted
    /// chunks until the state is rebuilt with [`SharedBm25State::refit`].
    pub fn reset(&self, namespace: &str) -> Result<(), FuseError> {
        self.index
            .delete(namespace, DeleteScope::All)
            .in_namespace(namespace)?;
        tracing::info!("Deleted all data in namespace '{}'", namespace);
        Ok(())
    }

    /// Pick the id for a chunk by comparing it with its nearest stored
    /// neighbour and with records pending in this call.
    fn resolve_id(
        &self,
        namespace: &str,
        chunk: &ChunkRecord,
        values: &[f32],
        pending: &[VectorRecord],
    ) -> Result<IdDecision, FuseError> {
        if let Some(id) = &chunk.id {
            return Ok(IdDecision::Insert(id.clone()));
        }
        if !self.config.check_duplicates {
            return Ok(IdDecision::Insert(uuid::Uuid::new_v4().to_string()));
        }

        let query = VectorQuery::new(values, 1)
            .with_namespace(namespace)
            .with_metadata(false);
        let stored = self
            .index
            .query(&query)
            .in_namespace(namespace)?
            .into_iter()
            .next()
            .map(|m| (m.id, m.score));

        let metric = self.index.metric();
        let queued = pending
            .iter()
            .map(|r| (r.id.clone(), metric.score(values, &r.values)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let best = match (stored, queued) {
            (Some(a), Some(b)) => Some(if b.1 > a.1 { b } else { a }),
            (a, b) => a.or(b),
        };

        Ok(match best {
            Some((_, score)) if score >= self.config.exact_match_threshold => {
                tracing::debug!("Skipping chunk from {} (score={:.5})", chunk.source_file, score);
                IdDecision::Skip
            }
            Some((id, score)) if score >= self.config.similarity_threshold => {
                tracing::debug!("Replacing {} (score={:.5})", id, score);
                IdDecision::Replace(id)
            }
            _ => IdDecision::Insert(uuid::Uuid::new_v4().to_string()),
        })
    }
}
