//! Sparse vectors: `{indices, values}` pairs for lexical similarity.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// A variable-length list of `(index, weight)` pairs.
///
/// `indices` and `values` always have the same length and no index repeats.
/// Indices need not be sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SparseParts")]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct SparseParts {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl TryFrom<SparseParts> for SparseVector {
    type Error = DbError;

    fn try_from(parts: SparseParts) -> Result<Self, Self::Error> {
        SparseVector::new(parts.indices, parts.values)
    }
}

impl SparseVector {
    /// Build a sparse vector, checking the length and uniqueness invariants.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> DbResult<Self> {
        if indices.len() != values.len() {
            return Err(DbError::invalid_sparse(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }

        let mut seen = HashSet::with_capacity(indices.len());
        if let Some(dup) = indices.iter().find(|idx| !seen.insert(**idx)) {
            return Err(DbError::invalid_sparse(format!("index {} repeats", dup)));
        }

        Ok(Self { indices, values })
    }

    /// Build from an index-to-weight map. Entries come out sorted by index.
    pub fn from_weights(weights: BTreeMap<u32, f32>) -> Self {
        let (indices, values) = weights.into_iter().unzip();
        Self { indices, values }
    }

    /// The vector with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate `(index, value)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Multiply every value by `factor`; indices are unchanged.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            indices: self.indices.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Inner product over shared indices.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        if small.is_empty() {
            return 0.0;
        }

        let lookup: std::collections::HashMap<u32, f32> = large.iter().collect();
        small
            .iter()
            .filter_map(|(idx, v)| lookup.get(&idx).map(|w| v * w))
            .sum()
    }

    /// Split into `(indices, values)`.
    pub fn into_parts(self) -> (Vec<u32>, Vec<f32>) {
        (self.indices, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_weights_sorts_indices() {
        let weights: BTreeMap<u32, f32> = [(9, 0.1), (2, 0.7), (5, 0.2)].into_iter().collect();
        let sparse = SparseVector::from_weights(weights);
        assert_eq!(sparse.indices(), &[2, 5, 9]);
        assert_eq!(sparse.values(), &[0.7, 0.2, 0.1]);
        assert!(SparseVector::from_weights(BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = SparseVector::new(vec![1, 2], vec![0.5]).unwrap_err();
        assert!(matches!(err, DbError::InvalidSparseVector { .. }));
    }

    #[test]
    fn test_new_rejects_repeated_index() {
        let err = SparseVector::new(vec![7, 3, 7], vec![0.1, 0.2, 0.3]).unwrap_err();
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_unsorted_indices_allowed() {
        let sparse = SparseVector::new(vec![9, 2, 5], vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(sparse.indices(), &[9, 2, 5]);
        assert_eq!(sparse.len(), 3);
    }

    #[test]
    fn test_scaled_keeps_indices() {
        let sparse = SparseVector::new(vec![4, 1], vec![1.0, 0.5]).unwrap();
        let scaled = sparse.scaled(0.25);
        assert_eq!(scaled.indices(), &[4, 1]);
        assert_eq!(scaled.values(), &[0.25, 0.125]);
    }

    #[test]
    fn test_dot_over_shared_indices() {
        let a = SparseVector::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0]).unwrap();
        let b = SparseVector::new(vec![3, 1, 10], vec![0.5, 4.0, 9.0]).unwrap();
        assert!((a.dot(&b) - (4.0 + 1.5)).abs() < 1e-6);
        assert_eq!(a.dot(&SparseVector::empty()), 0.0);
    }

    #[test]
    fn test_serde_shape() {
        let sparse = SparseVector::new(vec![1], vec![0.5]).unwrap();
        let json = serde_json::to_value(&sparse).unwrap();
        assert_eq!(json, serde_json::json!({"indices": [1], "values": [0.5]}));
    }

    #[test]
    fn test_deserialize_checks_invariants() {
        let bad = serde_json::from_str::<SparseVector>(r#"{"indices":[1,1],"values":[0.1,0.2]}"#);
        assert!(bad.is_err());
    }
}
