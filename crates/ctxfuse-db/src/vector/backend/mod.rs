//! Vector index backend implementations.
//!
//! ## Available Backends
//!
//! - `memory`: In-process linear scan with optional JSONL persistence
//! - `remote` (default feature): Pinecone-compatible REST service

mod memory;

#[cfg(feature = "remote")]
mod remote;

pub use memory::MemoryVectorIndex;

#[cfg(feature = "remote")]
pub use remote::RemoteVectorIndex;

use super::config::{IndexBackendKind, VectorIndexConfig};
use super::traits::VectorIndexBackend;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::debug;

/// Open a vector index with the given configuration.
///
/// This is the main factory function for creating vector index instances.
///
/// # Errors
///
/// Returns an error if:
/// - The dimension is zero
/// - The backend is not compiled in
/// - The backend cannot be opened (missing endpoint or key, unreadable file)
pub fn open_vector_index(config: &VectorIndexConfig) -> DbResult<Arc<dyn VectorIndexBackend>> {
    debug!(
        "Opening {} vector index (dimension={}, metric={})",
        config.backend, config.dimension, config.metric
    );

    if config.dimension == 0 {
        return Err(DbError::config("index.dimension must be greater than 0"));
    }

    match config.backend {
        IndexBackendKind::Memory => Ok(Arc::new(MemoryVectorIndex::open(config)?)),

        #[cfg(feature = "remote")]
        IndexBackendKind::Remote => Ok(Arc::new(RemoteVectorIndex::open(config)?)),

        #[cfg(not(feature = "remote"))]
        IndexBackendKind::Remote => Err(DbError::config(
            "remote backend not enabled. Rebuild ctxfuse-db with the 'remote' feature.",
        )),
    }
}
