//! BM25 Lexical Scorer.
//!
//! Encodes text into sparse `{indices, values}` vectors that sit next to the
//! dense embedding in every hybrid query and every stored chunk.
//!
//! ## Architecture
//!
//! ```text
//! Ingestion                          Query
//!   │                                  │
//!   ├──► fit(corpus) ──► Bm25State     │
//!   │        │   (swap into            │
//!   │        │    SharedBm25State)     │
//!   │        ▼                         ▼
//!   └──► encode_documents(chunk)   encode_queries(question)
//!            │                         │
//!            ▼                         ▼
//!        stored sparse values  ·  query sparse vector  =  lexical score
//! ```
//!
//! ## Key Components
//!
//! - [`tokenizer`]: Unicode-aware tokenization, stemming and term hashing
//! - [`scorer`]: IDF and saturated TF weights (k1=1.2, b=0.75)
//! - [`state`]: `Bm25State::{Fitted, Neutral}` and the encoder implementation
//! - [`storage`]: bincode persistence with a version header
//! - [`shared`]: atomically swappable snapshot for concurrent readers
//!
//! ## Usage
//!
//! ```ignore
//! use ctxfuse_core::bm25::{Bm25Config, Bm25State, SparseEncoder};
//!
//! let config = Bm25Config::default();
//! let state = Bm25State::fit(&texts, &config).unwrap_or_else(|_| Bm25State::neutral(&config));
//! let sparse = state.encode_queries("what is opportunity cost?");
//! ```

mod scorer;
mod shared;
mod state;
mod storage;
mod tokenizer;

pub use scorer::{idf, tf_weight, Bm25Params};
pub use shared::SharedBm25State;
pub use state::{Bm25Settings, Bm25State, Bm25Stats, CorpusStats};
pub use storage::{
    load, load_meta, load_or_neutral, load_state_file, meta_path, save, save_state_file,
    Bm25StateMeta, STATE_FORMAT_VERSION,
};
pub use tokenizer::{term_index, Tokenizer, TokenizerConfig};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ctxfuse_db::vector::SparseVector;

use crate::errors::FuseError;

// ============================================================================
// Encoder capability
// ============================================================================

/// Turns text into BM25 sparse vectors.
///
/// Output is deterministic for a given state and text, indices never repeat,
/// and text with no surviving tokens encodes to an empty vector.
pub trait SparseEncoder: Send + Sync {
    /// Query-side weights: IDF per distinct term, normalized to sum to 1.
    fn encode_queries(&self, text: &str) -> SparseVector;

    /// Document-side weights: saturated, length-normalized term frequency.
    fn encode_documents(&self, text: &str) -> SparseVector;
}

/// Encode a question against a state.
pub fn encode(state: &dyn SparseEncoder, text: &str) -> SparseVector {
    state.encode_queries(text)
}

// ============================================================================
// Configuration
// ============================================================================

/// BM25 configuration.
///
/// Controls tokenization, scoring parameters and where the fitted state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25Config {
    /// BM25 k1 parameter - term frequency saturation.
    /// Default: 1.2
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// BM25 b parameter - document length normalization.
    /// 0 = no length normalization, 1 = full normalization.
    /// Default: 0.75
    #[serde(default = "default_b")]
    pub b: f32,

    /// Whether to stem tokens.
    /// Default: true
    #[serde(default = "default_stemming")]
    pub stemming: bool,

    /// Whether to remove stop words during tokenization.
    /// Default: true
    #[serde(default = "default_remove_stopwords")]
    pub remove_stopwords: bool,

    /// Minimum token length to include.
    /// Default: 2
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,

    /// File holding the persisted state. `None` keeps the state in memory only.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

fn default_stemming() -> bool {
    true
}

fn default_remove_stopwords() -> bool {
    true
}

fn default_min_token_length() -> usize {
    2
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            stemming: default_stemming(),
            remove_stopwords: default_remove_stopwords(),
            min_token_length: default_min_token_length(),
            state_path: None,
        }
    }
}

impl Bm25Config {
    /// Validates the BM25 configuration, returning warnings for questionable values.
    ///
    /// # Errors
    /// Returns an error if `k1` is negative or `b` is outside [0, 1].
    pub fn validate(&self) -> Result<Vec<String>, FuseError> {
        let mut warnings = Vec::new();

        if self.k1.is_nan() || self.k1 < 0.0 {
            return Err(FuseError::InvalidConfiguration {
                message: format!("bm25.k1 must be non-negative, got {}", self.k1),
                hint: "Set k1 to 0.0 or higher (recommended: 1.2)".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.b) {
            return Err(FuseError::InvalidConfiguration {
                message: format!("bm25.b must be within [0, 1], got {}", self.b),
                hint: "Set b between 0.0 and 1.0 (recommended: 0.75)".to_string(),
            });
        }

        if self.k1 > 3.0 {
            warnings.push(format!(
                "bm25.k1={} is unusually large; repeated terms will dominate (recommended: 1.2)",
                self.k1
            ));
        }

        if self.min_token_length == 0 {
            warnings.push(
                "bm25.minTokenLength is 0; single characters and punctuation-like tokens \
                 will be indexed"
                    .to_string(),
            );
        }

        if self.state_path.is_none() {
            warnings.push(
                "bm25.statePath is not set; fitted statistics are lost on restart".to_string(),
            );
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Bm25Config::default();
        assert!((config.k1 - 1.2).abs() < 0.001);
        assert!((config.b - 0.75).abs() < 0.001);
        assert!(config.stemming);
        assert!(config.remove_stopwords);
        assert_eq!(config.min_token_length, 2);
        assert!(config.state_path.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let negative_k1 = Bm25Config {
            k1: -0.1,
            ..Default::default()
        };
        assert!(negative_k1.validate().unwrap_err().to_string().contains("k1"));

        let bad_b = Bm25Config {
            b: 1.5,
            ..Default::default()
        };
        assert!(bad_b.validate().unwrap_err().to_string().contains("bm25.b"));
    }

    #[test]
    fn test_validate_warnings() {
        let config = Bm25Config {
            min_token_length: 0,
            state_path: Some(PathBuf::from("/tmp/bm25.bin")),
            ..Default::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("minTokenLength"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: Bm25Config =
            serde_json::from_str(r#"{"k1": 1.5, "removeStopwords": false, "statePath": "s.bin"}"#)
                .unwrap();
        assert!((config.k1 - 1.5).abs() < 0.001);
        assert!(!config.remove_stopwords);
        assert_eq!(config.state_path, Some(PathBuf::from("s.bin")));
        assert!((config.b - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_encode_uses_query_side() {
        let state = Bm25State::neutral(&Bm25Config::default());
        assert_eq!(encode(&state, "market price"), state.encode_queries("market price"));
    }
}
