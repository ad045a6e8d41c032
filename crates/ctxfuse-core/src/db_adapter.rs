//! Adapter layer for ctxfuse-db infrastructure.
//!
//! This module bridges ctxfuse-db implementations with ctxfuse-core's domain types.
//! It provides:
//!
//! - Error conversion from `DbError` to `FuseError`
//! - Index construction from configuration
//!
//! ## Architecture
//!
//! ```text
//! ctxfuse-core domain code (retriever, ingest)
//!        ↓
//!   db_adapter (this module) - conversions
//!        ↓
//!     ctxfuse-db implementations (memory index, remote REST index)
//! ```

use std::sync::Arc;

use ctxfuse_db::vector::{open_vector_index, VectorIndexBackend, VectorIndexConfig};
use ctxfuse_db::{DbError, DbResult};

use crate::errors::FuseError;

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a ctxfuse-db error raised while working in `namespace`.
///
/// Timeouts keep their own variant, configuration problems become
/// `InvalidConfiguration`, and the rest are retrieval failures.
pub fn from_db_error(err: DbError, namespace: &str) -> FuseError {
    match err {
        DbError::Timeout {
            operation,
            timeout_ms,
        } => FuseError::Timeout {
            operation: format!("vector index {}", operation),
            timeout_ms,
        },

        DbError::Config { message } => FuseError::InvalidConfiguration {
            message: format!("index: {}", message),
            hint: "Check the index section of the config".to_string(),
        },

        err @ DbError::DimensionMismatch { .. } => FuseError::InvalidConfiguration {
            message: err.to_string(),
            hint: "embedding.dimension must equal index.dimension".to_string(),
        },

        DbError::InvalidSparseVector { reason } => {
            FuseError::invalid_parameter("sparse_vector", reason)
        }

        other => FuseError::Retrieval {
            namespace: namespace.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Extension trait to convert `DbResult` for a namespace.
pub trait NamespacedResult<T> {
    fn in_namespace(self, namespace: &str) -> Result<T, FuseError>;
}

impl<T> NamespacedResult<T> for DbResult<T> {
    fn in_namespace(self, namespace: &str) -> Result<T, FuseError> {
        self.map_err(|e| from_db_error(e, namespace))
    }
}

/// Open the configured vector index.
pub fn open_index(config: &VectorIndexConfig) -> Result<Arc<dyn VectorIndexBackend>, FuseError> {
    open_vector_index(config).map_err(|e| from_db_error(e, ""))
}
