//! Error types for ctxfuse-core.
//!
//! Three families, each with a different caller policy:
//!
//! - **Caller bugs** (`InvalidParameter`, `InvalidConfiguration`): surfaced
//!   immediately, never retried.
//! - **Degradable** (`EmptyCorpus`, `StateLoad`): the lexical scorer falls back
//!   to a neutral state and the pipeline continues.
//! - **Infrastructure** (`Retrieval`, `Embedding`, `Timeout`): fatal to the one
//!   query; callers usually answer with an empty context instead.

use thiserror::Error;

/// Domain-specific errors for ctxfuse operations.
#[derive(Error, Debug)]
pub enum FuseError {
    /// A call argument is out of range (e.g. alpha outside [0, 1], top_k = 0).
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What is wrong with the value.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Config invalid: {0}")]
    ConfigLoad(String),

    /// BM25 fitting was given no documents.
    #[error("Cannot fit BM25 statistics over an empty corpus")]
    EmptyCorpus,

    /// Persisted BM25 state is missing or corrupt.
    #[error("Failed to load BM25 state from {source_name}: {message}")]
    StateLoad {
        /// Where the state came from (path or "bytes").
        source_name: String,
        /// Decoder or I/O error.
        message: String,
    },

    /// BM25 state could not be written.
    #[error("Failed to save BM25 state to {target}: {message}")]
    StateSave {
        /// Where the state was going (path or "bytes").
        target: String,
        /// Encoder or I/O error.
        message: String,
    },

    /// The vector index call failed.
    #[error("Retrieval failed in namespace `{namespace}`: {reason}")]
    Retrieval {
        /// Namespace that was queried or written.
        namespace: String,
        /// Underlying failure.
        reason: String,
    },

    /// The embedding service call failed.
    #[error("Embedding failed: {reason}")]
    Embedding {
        /// Underlying failure.
        reason: String,
    },

    /// An external call did not finish within its timeout.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        /// Which call timed out.
        operation: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FuseError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Bad arguments or configuration; retrying cannot help.
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::InvalidConfiguration { .. }
        )
    }

    /// The lexical scorer can continue with a neutral state.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::EmptyCorpus | Self::StateLoad { .. })
    }

    /// Network or service failure of an external collaborator.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Retrieval { .. } | Self::Embedding { .. } | Self::Timeout { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
