//! Near-duplicate removal by word-set Jaccard similarity.
//!
//! O(n²) over the kept list; n is bounded by `top_k`.

use std::collections::HashSet;

/// Default similarity at or above which a chunk counts as a duplicate.
pub const DEFAULT_DEDUP_THRESHOLD: f32 = 0.85;

/// Lowercased, whitespace-split word set.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// J(A, B) = |A ∩ B| / |A ∪ B|. Returns 0.0 if both sets are empty.
pub fn jaccard_from_sets(set_a: &HashSet<String>, set_b: &HashSet<String>) -> f64 {
    let union = set_a.union(set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(set_b).count();
    intersection as f64 / union as f64
}

/// Jaccard similarity of two texts' word sets.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    jaccard_from_sets(&word_set(a), &word_set(b))
}

/// Drop items whose text is too similar to an earlier kept item.
///
/// Items are visited in order; the first of a near-duplicate group wins.
/// Items sharing no words are never duplicates, whatever the threshold.
pub fn deduplicate_by<T, F>(items: Vec<T>, text_of: F, similarity_threshold: f32) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let threshold = similarity_threshold as f64;
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    let mut kept_sets: Vec<HashSet<String>> = Vec::with_capacity(items.len());

    for item in items {
        let words = word_set(text_of(&item));
        let duplicate = kept_sets
            .iter()
            .any(|seen| {
                let similarity = jaccard_from_sets(&words, seen);
                similarity > 0.0 && similarity >= threshold
            });

        if !duplicate {
            kept_sets.push(words);
            kept.push(item);
        }
    }

    kept
}

/// Remove near-duplicate chunks, preserving order.
pub fn deduplicate<S: AsRef<str>>(chunks: &[S], similarity_threshold: f32) -> Vec<String> {
    let owned: Vec<String> = chunks.iter().map(|c| c.as_ref().to_string()).collect();
    deduplicate_by(owned, |c| c.as_str(), similarity_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_chunk_dropped() {
        let chunks = [
            "The cat sat on the mat",
            "The cat sat on the mat today",
            "A totally different sentence",
        ];
        assert_eq!(
            deduplicate(&chunks, 0.5),
            vec!["The cat sat on the mat", "A totally different sentence"]
        );
    }

    #[test]
    fn test_idempotent() {
        let chunks = [
            "Supply meets demand at the equilibrium price",
            "supply meets demand at the equilibrium price point",
            "Demand curves slope downward",
            "Prices rise when supply falls",
            "demand curves slope downward.",
        ];
        for threshold in [0.3, 0.5, 0.85, 1.0] {
            let once = deduplicate(&chunks, threshold);
            assert_eq!(deduplicate(once.as_slice(), threshold), once);
        }
    }

    #[test]
    fn test_empty_input() {
        let empty: [&str; 0] = [];
        assert!(deduplicate(&empty, 0.85).is_empty());
    }

    #[test]
    fn test_disjoint_chunks_never_duplicates() {
        assert_eq!(jaccard_similarity("alpha beta", "gamma delta"), 0.0);
        assert_eq!(deduplicate(&["alpha beta", "gamma delta"], 0.0).len(), 2);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(jaccard_similarity("Market PRICE", "market price"), 1.0);
        assert_eq!(deduplicate(&["Market PRICE", "market price"], 0.85).len(), 1);
    }

    #[test]
    fn test_empty_texts_are_kept() {
        assert_eq!(jaccard_similarity("", ""), 0.0);
        assert_eq!(deduplicate(&["", ""], 0.5).len(), 2);
    }

    #[test]
    fn test_compares_against_every_kept_chunk() {
        let chunks = ["one two three", "four five six", "four five six seven"];
        assert_eq!(
            deduplicate(&chunks, 0.7),
            vec!["one two three", "four five six"]
        );
    }

    #[test]
    fn test_deduplicate_by_keeps_payload() {
        let items = vec![("a.pdf", "cells divide by mitosis"), ("b.pdf", "Cells divide by mitosis")];
        let kept = deduplicate_by(items, |(_, text)| *text, 0.85);
        assert_eq!(kept, vec![("a.pdf", "cells divide by mitosis")]);
    }
}
