//! Error types for ctxfuse-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ctxfuse-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in ctxfuse-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Vector errors
    // ========================================================================
    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Sparse vector violates its shape invariants.
    #[error("Invalid sparse vector: {reason}")]
    InvalidSparseVector { reason: String },

    // ========================================================================
    // Index errors
    // ========================================================================
    /// Vector index I/O error.
    #[error("Vector index I/O error at {path}: {message}")]
    VectorIo { path: PathBuf, message: String },

    /// Vector index parse error.
    #[error("Vector index parse error at {path}: {message}")]
    VectorParse { path: PathBuf, message: String },

    /// The index service did not answer within the timeout.
    #[error("Vector index {operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The index service rejected or failed the call.
    #[error("Vector index {operation} failed: {message}")]
    Remote { operation: String, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an invalid sparse vector error.
    pub fn invalid_sparse(reason: impl Into<String>) -> Self {
        Self::InvalidSparseVector {
            reason: reason.into(),
        }
    }

    /// Create a vector I/O error.
    pub fn vector_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector parse error.
    pub fn vector_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a remote call error.
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error came from a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(feature = "remote")]
impl DbError {
    /// Convert a transport error for the named operation.
    pub fn from_transport(operation: &str, err: ctxfuse_utils::UtilsError) -> Self {
        match err {
            ctxfuse_utils::UtilsError::Timeout { timeout_ms, .. } => Self::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            },
            ctxfuse_utils::UtilsError::ClientBuild(message) => Self::Config { message },
            other => Self::Remote {
                operation: operation.to_string(),
                message: other.to_string(),
            },
        }
    }
}
