//! Candidate Retriever.
//!
//! Issues one hybrid query against the vector index and turns the matches
//! into [`Candidate`]s. No retries happen here.

use serde::{Deserialize, Serialize};

use ctxfuse_db::vector::{
    MetadataFilter, SparseVector, VectorIndexBackend, VectorMatch, VectorQuery, UNKNOWN_SOURCE,
};

use crate::db_adapter::NamespacedResult;
use crate::errors::FuseError;

/// A scored chunk returned for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Higher is more similar.
    pub score: f32,
    /// Chunk text; empty when the index returned no metadata.
    pub text: String,
    pub source_file: String,
    pub page_number: Option<u32>,
    /// Comma-joined subject tags.
    pub subjects: Option<String>,
}

impl From<VectorMatch> for Candidate {
    fn from(m: VectorMatch) -> Self {
        match m.metadata {
            Some(meta) => Self {
                subjects: meta.subjects_label(),
                id: m.id,
                score: m.score,
                text: meta.text,
                source_file: meta.source_file,
                page_number: meta.page_number,
            },
            None => Self {
                id: m.id,
                score: m.score,
                text: String::new(),
                source_file: UNKNOWN_SOURCE.to_string(),
                page_number: None,
                subjects: None,
            },
        }
    }
}

/// Query the index with a weighted dense/sparse pair.
///
/// `subject`, when given, is trimmed and lowercased and must match one of the
/// chunk's subject tags exactly. Results come back sorted by descending score;
/// the index's own order is kept when it guarantees one.
///
/// # Errors
///
/// - [`FuseError::InvalidParameter`] when `top_k` is 0
/// - [`FuseError::Retrieval`] or [`FuseError::Timeout`] when the index call fails
pub fn retrieve(
    index: &dyn VectorIndexBackend,
    dense: &[f32],
    sparse: &SparseVector,
    subject: Option<&str>,
    namespace: &str,
    top_k: usize,
) -> Result<Vec<Candidate>, FuseError> {
    if top_k == 0 {
        return Err(FuseError::invalid_parameter(
            "top_k",
            "must be greater than 0",
        ));
    }

    let filter = MetadataFilter::for_subject(subject);
    let query = VectorQuery::new(dense, top_k)
        .with_sparse(sparse)
        .with_namespace(namespace)
        .with_filter(filter.as_ref())
        .with_metadata(true);

    let matches = index.query(&query).in_namespace(namespace)?;

    let mut candidates: Vec<Candidate> = matches.into_iter().map(Candidate::from).collect();
    if !index.orders_results() {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    tracing::debug!(
        "Retrieved {} candidates from '{}' (top_k={}, subject={:?})",
        candidates.len(),
        namespace,
        top_k,
        filter.as_ref().and_then(|f| f.subject())
    );

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scored, ScriptedIndex};
    use ctxfuse_db::vector::ChunkMetadata;

    fn query_parts() -> (Vec<f32>, SparseVector) {
        (vec![0.1; 8], SparseVector::new(vec![3, 9], vec![0.6, 0.4]).unwrap())
    }

    #[test]
    fn test_keeps_index_order_when_guaranteed() {
        let index = ScriptedIndex::new(
            vec![
                scored("a", 0.2, "first", "a.pdf"),
                scored("b", 0.9, "second", "b.pdf"),
            ],
            true,
        );
        let (dense, sparse) = query_parts();
        let candidates = retrieve(&index, &dense, &sparse, None, "ns", 5).unwrap();

        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sorts_when_order_not_guaranteed() {
        let index = ScriptedIndex::new(
            vec![
                scored("low", 0.2, "x", "a.pdf"),
                scored("high", 0.9, "y", "a.pdf"),
                scored("mid", 0.5, "z", "a.pdf"),
            ],
            false,
        );
        let (dense, sparse) = query_parts();
        let candidates = retrieve(&index, &dense, &sparse, None, "ns", 5).unwrap();

        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_passes_query_parameters() {
        let index = ScriptedIndex::new(Vec::new(), true);
        let (dense, sparse) = query_parts();
        retrieve(&index, &dense, &sparse, Some("  Economics "), "course", 7).unwrap();

        let recorded = index.recorded().unwrap();
        assert_eq!(recorded.top_k, 7);
        assert_eq!(recorded.namespace, "course");
        assert_eq!(recorded.subject.as_deref(), Some("economics"));
        assert_eq!(recorded.sparse_len, 2);
    }

    #[test]
    fn test_subject_filter_restricts_candidates() {
        let econ = VectorMatch::new("econ", 0.8).with_metadata(
            ChunkMetadata::new("Scarcity", "econ.pdf").with_subjects("Economics"),
        );
        let bio = VectorMatch::new("bio", 0.9)
            .with_metadata(ChunkMetadata::new("Cells", "bio.pdf").with_subjects("biology"));
        let index = ScriptedIndex::new(vec![bio, econ], true);
        let (dense, sparse) = query_parts();

        let candidates = retrieve(&index, &dense, &sparse, Some("ECONOMICS"), "ns", 5).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "econ");
        assert_eq!(candidates[0].subjects.as_deref(), Some("economics"));

        // Blank subject means no restriction.
        let all = retrieve(&index, &dense, &sparse, Some("  "), "ns", 5).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let index = ScriptedIndex::new(Vec::new(), true);
        let (dense, sparse) = query_parts();
        let err = retrieve(&index, &dense, &sparse, None, "ns", 0).unwrap_err();
        assert!(err.is_caller_bug());
    }

    #[test]
    fn test_index_failure_propagates() {
        let index = ScriptedIndex::failing();
        let (dense, sparse) = query_parts();
        let err = retrieve(&index, &dense, &sparse, None, "ns", 3).unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_candidate_without_metadata() {
        let candidate = Candidate::from(VectorMatch::new("bare", 0.4));
        assert_eq!(candidate.text, "");
        assert_eq!(candidate.source_file, UNKNOWN_SOURCE);
        assert!(candidate.page_number.is_none());
    }
}
