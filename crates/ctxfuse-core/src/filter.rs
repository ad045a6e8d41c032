//! Adaptive relevance filter.
//!
//! The cutoff is derived from the score distribution of the current result
//! set, never below a fixed floor:
//!
//! ```text
//! threshold = max(mean - 0.5 * std_dev, absolute_floor)
//! ```
//!
//! `std_dev` is the population standard deviation. When fewer than
//! [`MIN_CANDIDATES`] survive but at least that many came in, the top
//! [`MIN_CANDIDATES`] by score are returned instead.

use crate::retriever::Candidate;

/// Default absolute floor.
pub const DEFAULT_ABSOLUTE_FLOOR: f32 = 0.3;

/// Minimum result size guaranteed when the input is large enough.
pub const MIN_CANDIDATES: usize = 3;

const STD_DEV_FACTOR: f64 = 0.5;

/// Population mean and standard deviation. `None` for empty input.
pub fn score_stats(scores: &[f32]) -> Option<(f64, f64)> {
    if scores.is_empty() {
        return None;
    }

    let n = scores.len() as f64;
    let mean = scores.iter().map(|s| *s as f64).sum::<f64>() / n;
    let variance = scores
        .iter()
        .map(|s| (*s as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    Some((mean, variance.sqrt()))
}

/// The cutoff for a set of scores. `None` for empty input.
pub fn adaptive_threshold(scores: &[f32], absolute_floor: f32) -> Option<f32> {
    score_stats(scores).map(|(mean, std_dev)| {
        let adaptive = (mean - STD_DEV_FACTOR * std_dev) as f32;
        adaptive.max(absolute_floor)
    })
}

/// Keep the candidates that clear the adaptive threshold.
///
/// Survivors keep their input order. The top-N override returns candidates
/// by descending score, ties in input order.
pub fn adaptive_filter(candidates: Vec<Candidate>, absolute_floor: f32) -> Vec<Candidate> {
    let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    let Some(threshold) = adaptive_threshold(&scores, absolute_floor) else {
        return Vec::new();
    };

    let total = candidates.len();
    let survivors = scores.iter().filter(|s| **s >= threshold).count();

    if survivors < MIN_CANDIDATES && total >= MIN_CANDIDATES {
        tracing::debug!(
            "Adaptive filter kept {} of {} at threshold {:.3}; returning top {}",
            survivors,
            total,
            threshold,
            MIN_CANDIDATES
        );
        let mut ranked = candidates;
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(MIN_CANDIDATES);
        return ranked;
    }

    tracing::debug!(
        "Adaptive filter kept {} of {} at threshold {:.3}",
        survivors,
        total,
        threshold
    );

    candidates
        .into_iter()
        .filter(|c| c.score >= threshold)
        .collect()
}
