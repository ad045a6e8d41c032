//! BM25 weighting functions.
//!
//! Okapi BM25 splits into two factors that end up on opposite sides of an
//! inner product:
//!
//! ```text
//! query side:    IDF(t) = ln((N - df(t) + 0.5) / (df(t) + 0.5) + 1)
//! document side: TF(t, D) = f(t, D) / (f(t, D) + k1 * (1 - b + b * |D| / avgdl))
//! ```
//!
//! Where:
//! - N = number of documents in the fitted corpus
//! - df(t) = number of documents containing term t
//! - f(t, D) = frequency of term t in document D
//! - |D| = document length in tokens, avgdl = average document length
//! - k1 = term frequency saturation (default 1.2)
//! - b = length normalization (default 0.75)

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// BM25 tuning constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Bm25Params {
    /// Term frequency saturation. Higher values give more weight to repeats.
    pub k1: f32,

    /// Document length normalization. 0 = none, 1 = full.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Smoothed inverse document frequency. Always positive and finite.
#[inline]
pub fn idf(num_docs: u32, doc_freq: u32) -> f32 {
    let n = num_docs as f32;
    let df = doc_freq as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Saturated, length-normalized term frequency for the document side.
///
/// A non-positive `avg_doc_len` treats the document as average length.
#[inline]
pub fn tf_weight(term_freq: u32, doc_len: usize, avg_doc_len: f32, params: &Bm25Params) -> f32 {
    if term_freq == 0 {
        return 0.0;
    }

    let tf = term_freq as f32;
    let length_ratio = if avg_doc_len > 0.0 {
        doc_len as f32 / avg_doc_len
    } else {
        1.0
    };

    tf / (tf + params.k1 * (1.0 - params.b + params.b * length_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_common_term() {
        let idf_val = idf(1000, 900);
        assert!(idf_val < 0.5);
        assert!(idf_val > 0.0);
    }

    #[test]
    fn test_idf_rare_term() {
        assert!(idf(1000, 10) > 3.0);
        assert!(idf(1000, 1) > idf(1000, 10));
    }

    #[test]
    fn test_idf_unseen_term() {
        // Nothing fitted: every term gets ln 2.
        assert!((idf(0, 0) - std::f32::consts::LN_2).abs() < 1e-6);
        assert!(idf(1000, 0).is_finite());
    }

    #[test]
    fn test_tf_weight_length_normalization() {
        let params = Bm25Params::default();
        let short = tf_weight(3, 50, 100.0, &params);
        let long = tf_weight(3, 200, 100.0, &params);
        assert!(short > long);
    }

    #[test]
    fn test_tf_weight_saturates_below_one() {
        let params = Bm25Params::default();
        let w1 = tf_weight(1, 100, 100.0, &params);
        let w10 = tf_weight(10, 100, 100.0, &params);
        let w100 = tf_weight(100, 100, 100.0, &params);

        assert!(w10 > w1);
        assert!(w100 > w10);
        assert!(w100 < 1.0);
        // tf / (tf + k1) at average length
        assert!((w1 - 1.0 / 2.2).abs() < 1e-6);
    }

    #[test]
    fn test_tf_weight_without_length_normalization() {
        let params = Bm25Params { k1: 1.2, b: 0.0 };
        let short = tf_weight(2, 10, 100.0, &params);
        let long = tf_weight(2, 1000, 100.0, &params);
        assert!((short - long).abs() < 1e-6);
    }

    #[test]
    fn test_tf_weight_zero_avg() {
        let params = Bm25Params::default();
        assert!((tf_weight(1, 0, 0.0, &params) - 1.0 / 2.2).abs() < 1e-6);
        assert_eq!(tf_weight(0, 10, 10.0, &params), 0.0);
    }
}
