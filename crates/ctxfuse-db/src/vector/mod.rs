//! Vector index module for ctxfuse-db.
//!
//! Hybrid storage: every record holds a dense vector, optional sparse
//! weights and chunk metadata, partitioned by namespace.
//!
//! ## Usage
//!
//! ```ignore
//! use ctxfuse_db::vector::{open_vector_index, VectorIndexConfig, VectorQuery};
//!
//! let index = open_vector_index(&VectorIndexConfig::memory(1536))?;
//! index.upsert("course", &records)?;
//!
//! let matches = index.query(
//!     &VectorQuery::new(&dense, 10)
//!         .with_sparse(&sparse)
//!         .with_namespace("course"),
//! )?;
//! ```

mod backend;
mod config;
mod metadata;
mod sparse;
mod traits;

// Re-export main types
pub use config::{IndexBackendKind, VectorIndexConfig, DEFAULT_DIMENSION};
pub use metadata::{normalize_subject, parse_subjects, ChunkMetadata, MetadataFilter, UNKNOWN_SOURCE};
pub use sparse::SparseVector;
pub use traits::{
    cosine_similarity, dot_product, DeleteScope, VectorIndexBackend, VectorMatch, VectorMetric,
    VectorQuery, VectorRecord,
};

// Re-export backend factory function
pub use backend::open_vector_index;

// Re-export backends
pub use backend::MemoryVectorIndex;

#[cfg(feature = "remote")]
pub use backend::RemoteVectorIndex;
