//! Utility functions for ctxfuse
//!
//! This crate hosts the network-call wrapper used by the embedding and vector
//! index collaborators. It isolates the HTTP stack (reqwest) so the core engine
//! only sees typed errors.

use thiserror::Error;

pub mod http;

pub use http::{HttpClient, HttpClientConfig};

#[derive(Debug, Error)]
pub enum UtilsError {
    #[error("Request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl UtilsError {
    /// Whether the error came from the per-request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, UtilsError::Timeout { .. })
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            UtilsError::Timeout { .. } | UtilsError::Request { .. } => true,
            UtilsError::Status { status, .. } => *status == 429 || *status >= 500,
            UtilsError::Decode { .. } | UtilsError::ClientBuild(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let err = UtilsError::Timeout {
            url: "http://localhost/query".to_string(),
            timeout_ms: 500,
        };
        assert!(err.is_timeout());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err = UtilsError::Status {
            url: "http://localhost/query".to_string(),
            status: 400,
            body: "bad request".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());

        let throttled = UtilsError::Status {
            url: "http://localhost/query".to_string(),
            status: 429,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = UtilsError::Timeout {
            url: "http://idx/query".to_string(),
            timeout_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "Request to http://idx/query timed out after 1500 ms"
        );
    }
}
