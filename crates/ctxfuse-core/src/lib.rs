//! # ctxfuse-core
//!
//! **Context fusion** – hybrid retrieval engine.
//!
//! Given a question, this crate fetches the most relevant stored chunks using
//! a dense embedding and a BM25 sparse vector in a single index query, keeps
//! the ones that clear an adaptive relevance threshold, removes
//! near-duplicates and fits the rest into a token budget.
//!
//! ## Main Types
//!
//! - [`ContextEngine`] – entry point; [`ContextEngine::build_context`]
//! - [`Ingestor`] – writes chunks and keeps the BM25 statistics current
//! - [`RetrievalResult`] – assembled context with per-chunk provenance
//! - [`FuseError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`bm25`] – lexical scorer: tokenizer, fitted/neutral state, persistence
//! - [`hybrid`] – convex dense/sparse weighting
//! - [`retriever`] – candidate retrieval from the vector index
//! - [`filter`] – adaptive relevance filter
//! - [`dedup`] – Jaccard near-duplicate removal
//! - [`context`] – token-budget truncation and assembly
//! - [`pipeline`] – the engine tying the stages together
//! - [`ingest`] – ingestion of pre-chunked text
//! - [`config`] – configuration types
//!
//! ## Example
//!
//! ```ignore
//! use ctxfuse_core::{ContextEngine, EngineConfig};
//!
//! let config = EngineConfig::load_default()?;
//! let engine = ContextEngine::from_config(&config)?;
//!
//! let result = engine.build_context_or_empty(
//!     "What is opportunity cost?",
//!     "econ-101",
//!     Some("economics"),
//!     &config.retrieval,
//! )?;
//! for source in &result.sources {
//!     println!("{}", source);
//! }
//! ```

// Modules
pub mod bm25;
pub mod config;
pub mod context;
pub mod db_adapter;
pub mod dedup;
pub mod embedding;
pub mod errors;
pub mod filter;
pub mod hybrid;
pub mod ingest;
pub mod model_adapter;
pub mod pipeline;
pub mod retriever;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use bm25::{
    load_or_neutral, Bm25Config, Bm25State, Bm25Stats, SharedBm25State, SparseEncoder,
};
pub use config::{EngineConfig, RetrievalConfig, DEFAULT_NAMESPACE, DEFAULT_TOP_K};
pub use context::{
    assemble, estimate_tokens, truncate, RetrievalResult, SourceRef, CONTEXT_SEPARATOR,
    DEFAULT_MAX_TOKENS,
};
pub use dedup::{deduplicate, jaccard_similarity, DEFAULT_DEDUP_THRESHOLD};
pub use embedding::EmbeddingBackend;
pub use errors::FuseError;
pub use filter::{adaptive_filter, adaptive_threshold, DEFAULT_ABSOLUTE_FLOOR, MIN_CANDIDATES};
pub use hybrid::{combine, DEFAULT_ALPHA};
pub use ingest::{ChunkRecord, IngestConfig, IngestReport, Ingestor};
pub use pipeline::ContextEngine;
pub use retriever::{retrieve, Candidate};

// ctxfuse-db adapter - vector index errors and factory
pub use db_adapter::{from_db_error, open_index, NamespacedResult};

// ctxfuse-model adapter - embedding service errors and factory
pub use model_adapter::{
    create_embedding_backend, from_model_error, IntoFuseResult, ModelEmbeddingBackend,
};
