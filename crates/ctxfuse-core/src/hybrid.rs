//! Convex weighting of dense and sparse query vectors.
//!
//! Scaling the dense half by `alpha` and the sparse half by `1 - alpha` means
//! that under an inner-product index the single similarity search scores
//!
//! ```text
//! alpha * dense_similarity + (1 - alpha) * sparse_similarity
//! ```

use ctxfuse_db::vector::SparseVector;

use crate::errors::FuseError;

/// Default dense weight.
pub const DEFAULT_ALPHA: f32 = 0.7;

/// Check that `alpha` lies in `[0, 1]`.
pub fn validate_alpha(alpha: f32) -> Result<(), FuseError> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(FuseError::invalid_parameter(
            "alpha",
            format!("must be within [0, 1], got {}", alpha),
        ))
    }
}

/// Weight a dense/sparse pair by `alpha`.
///
/// Sparse indices are unchanged.
///
/// # Errors
///
/// Returns [`FuseError::InvalidParameter`] when `alpha` is outside `[0, 1]`
/// (including NaN). Out-of-range values are never clamped.
pub fn combine(
    dense: &[f32],
    sparse: &SparseVector,
    alpha: f32,
) -> Result<(Vec<f32>, SparseVector), FuseError> {
    validate_alpha(alpha)?;

    let weighted_dense = dense.iter().map(|v| v * alpha).collect();
    let weighted_sparse = sparse.scaled(1.0 - alpha);
    Ok((weighted_dense, weighted_sparse))
}
