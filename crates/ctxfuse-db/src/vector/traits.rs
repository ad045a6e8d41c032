//! Vector index traits and core types.
//!
//! This module defines the core abstraction for hybrid (dense + sparse)
//! vector storage backends.

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

use super::metadata::{ChunkMetadata, MetadataFilter};
use super::sparse::SparseVector;

// ============================================================================
// VectorMetric
// ============================================================================

/// Similarity metric for dense vectors. Scores are always "higher = more similar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Inner product (default). Required for convex hybrid weighting.
    #[default]
    #[serde(alias = "dot")]
    DotProduct,
    /// Cosine similarity.
    Cosine,
    /// Negated Euclidean distance.
    Euclidean,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::DotProduct => "dotproduct",
            VectorMetric::Cosine => "cosine",
            VectorMetric::Euclidean => "euclidean",
        }
    }

    /// Score two dense vectors under this metric.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            VectorMetric::DotProduct => dot_product(a, b),
            VectorMetric::Cosine => cosine_similarity(a, b),
            VectorMetric::Euclidean => -euclidean_distance(a, b),
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compute dot product between two vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Compute Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// VectorRecord
// ============================================================================

/// A vector to insert or update in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Unique identifier within the namespace.
    pub id: String,

    /// Dense embedding.
    pub values: Vec<f32>,

    /// Lexical weights, when the record takes part in hybrid search.
    pub sparse_values: Option<SparseVector>,

    /// Chunk metadata.
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    /// Create a new record with required fields.
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: ChunkMetadata) -> Self {
        Self {
            id: id.into(),
            values,
            sparse_values: None,
            metadata,
        }
    }

    /// Attach sparse values.
    pub fn with_sparse(mut self, sparse: SparseVector) -> Self {
        self.sparse_values = Some(sparse);
        self
    }
}

// ============================================================================
// VectorQuery
// ============================================================================

/// A hybrid similarity query.
#[derive(Debug, Clone)]
pub struct VectorQuery<'a> {
    /// Dense query vector.
    pub vector: &'a [f32],
    /// Optional sparse query vector.
    pub sparse_vector: Option<&'a SparseVector>,
    /// Maximum number of matches.
    pub top_k: usize,
    /// Namespace to search.
    pub namespace: &'a str,
    /// Optional metadata restriction.
    pub filter: Option<&'a MetadataFilter>,
    /// Whether to return metadata with matches.
    pub include_metadata: bool,
}

impl<'a> VectorQuery<'a> {
    /// Create a dense-only query against the default namespace.
    pub fn new(vector: &'a [f32], top_k: usize) -> Self {
        Self {
            vector,
            sparse_vector: None,
            top_k,
            namespace: "",
            filter: None,
            include_metadata: true,
        }
    }

    /// Add a sparse vector.
    pub fn with_sparse(mut self, sparse: &'a SparseVector) -> Self {
        self.sparse_vector = Some(sparse);
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: &'a str) -> Self {
        self.namespace = namespace;
        self
    }

    /// Set the metadata filter.
    pub fn with_filter(mut self, filter: Option<&'a MetadataFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Toggle metadata in results.
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

// ============================================================================
// VectorMatch
// ============================================================================

/// A single scored match.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    /// Record identifier.
    pub id: String,

    /// Similarity score (higher is better).
    pub score: f32,

    /// Metadata, when requested and present.
    pub metadata: Option<ChunkMetadata>,
}

impl VectorMatch {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: None,
        }
    }

    /// Set the metadata.
    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ============================================================================
// DeleteScope
// ============================================================================

/// What a delete call removes from a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// Every record in the namespace.
    All,
    /// The listed record IDs.
    Ids(Vec<String>),
}

// ============================================================================
// VectorIndexBackend Trait
// ============================================================================

/// Core trait for hybrid vector index backends.
///
/// ## Implementation Notes
///
/// - Backends must be thread-safe (`Send + Sync`).
/// - Upsert semantics: a record with an existing ID replaces it.
/// - Namespaces are independent; an unknown namespace is empty, not an error.
pub trait VectorIndexBackend: Send + Sync {
    /// Query for the `top_k` most similar records.
    ///
    /// The hybrid score is the dense metric score plus the sparse inner
    /// product, when a sparse vector is given.
    fn query(&self, query: &VectorQuery<'_>) -> DbResult<Vec<VectorMatch>>;

    /// Insert or update records in a namespace. Returns the number written.
    fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> DbResult<usize>;

    /// Delete records from a namespace.
    fn delete(&self, namespace: &str, scope: DeleteScope) -> DbResult<()>;

    /// Number of records in a namespace.
    fn len(&self, namespace: &str) -> DbResult<usize>;

    /// Check if a namespace is empty.
    fn is_empty(&self, namespace: &str) -> DbResult<bool> {
        Ok(self.len(namespace)? == 0)
    }

    /// Get the dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Get the dense metric used by this index.
    fn metric(&self) -> VectorMetric;

    /// Whether `query` results are guaranteed sorted by descending score.
    fn orders_results(&self) -> bool {
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_metric() {
        assert_eq!(VectorMetric::DotProduct.as_str(), "dotproduct");
        assert_eq!(VectorMetric::Cosine.as_str(), "cosine");
        assert_eq!(VectorMetric::default(), VectorMetric::DotProduct);

        let parsed: VectorMetric = serde_json::from_str("\"dot\"").unwrap();
        assert_eq!(parsed, VectorMetric::DotProduct);
    }

    #[test]
    fn test_metric_scores() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert!((VectorMetric::DotProduct.score(&a, &b) - 32.0).abs() < 1e-6);

        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        assert!(VectorMetric::Cosine.score(&x, &y).abs() < 1e-6);
        assert!((VectorMetric::Cosine.score(&x, &x) - 1.0).abs() < 1e-6);

        let origin = [0.0, 0.0, 0.0];
        let p = [3.0, 4.0, 0.0];
        assert!((VectorMetric::Euclidean.score(&origin, &p) + 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_query_builder() {
        let dense = vec![0.1, 0.2];
        let sparse = SparseVector::new(vec![3], vec![0.5]).unwrap();
        let filter = MetadataFilter::new().with_subject("economics");

        let query = VectorQuery::new(&dense, 5)
            .with_sparse(&sparse)
            .with_namespace("course")
            .with_filter(Some(&filter));

        assert_eq!(query.top_k, 5);
        assert_eq!(query.namespace, "course");
        assert!(query.sparse_vector.is_some());
        assert!(query.include_metadata);
        assert_eq!(query.filter.and_then(|f| f.subject()), Some("economics"));
    }

    #[test]
    fn test_vector_record_builder() {
        let record = VectorRecord::new("chunk-1", vec![1.0], ChunkMetadata::new("t", "a.pdf"))
            .with_sparse(SparseVector::new(vec![1], vec![1.0]).unwrap());
        assert_eq!(record.id, "chunk-1");
        assert!(record.sparse_values.is_some());
    }
}
