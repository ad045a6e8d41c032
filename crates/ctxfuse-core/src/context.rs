//! Context assembly: dedup, token-budget truncation and joining.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dedup::deduplicate_by;
use crate::retriever::Candidate;

/// Separator placed between chunks in `context_text`.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Default token budget for the assembled context.
pub const DEFAULT_MAX_TOKENS: usize = 3000;

const CHARS_PER_TOKEN: f64 = 4.0;

/// Where a context chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_file: String,
    pub page_number: Option<u32>,
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page_number {
            Some(page) => write!(f, "{} (p. {})", self.source_file, page),
            None => write!(f, "{}", self.source_file),
        }
    }
}

/// Assembled context for one question.
///
/// `context_chunks[i]` came from `sources[i]`. An empty result is a valid
/// "no context found" outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub context_text: String,
    pub context_chunks: Vec<String>,
    pub sources: Vec<SourceRef>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_context(&self) -> bool {
        !self.context_chunks.is_empty()
    }
}

/// Approximate token count: characters / 4.
pub fn estimate_tokens(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_TOKEN
}

/// Longest prefix of `items` whose estimated tokens fit in `max_tokens`.
///
/// Stops at the first item that would exceed the budget, even if a later
/// one would fit.
pub fn truncate_by<T, F>(items: Vec<T>, text_of: F, max_tokens: usize) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    if max_tokens == 0 {
        return Vec::new();
    }

    let budget = max_tokens as f64;
    let mut used = 0.0f64;
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        let cost = estimate_tokens(text_of(&item));
        if used + cost > budget {
            break;
        }
        used += cost;
        kept.push(item);
    }

    kept
}

/// Truncate chunks to a token budget, keeping a strict prefix.
pub fn truncate<S: AsRef<str>>(chunks: &[S], max_tokens: usize) -> Vec<String> {
    let owned: Vec<String> = chunks.iter().map(|c| c.as_ref().to_string()).collect();
    truncate_by(owned, |c| c.as_str(), max_tokens)
}

/// Build the final result from filtered candidates.
///
/// Candidates with blank text are dropped, then near-duplicates, then
/// whatever does not fit the token budget.
pub fn assemble(
    candidates: Vec<Candidate>,
    dedup_threshold: f32,
    max_tokens: usize,
) -> RetrievalResult {
    let total = candidates.len();
    let with_text: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .collect();
    let unique = deduplicate_by(with_text, |c| c.text.as_str(), dedup_threshold);
    let deduped = unique.len();
    let fitted = truncate_by(unique, |c| c.text.as_str(), max_tokens);

    tracing::debug!(
        "Assembled {} chunks from {} candidates ({} after dedup)",
        fitted.len(),
        total,
        deduped
    );

    let (context_chunks, sources): (Vec<String>, Vec<SourceRef>) = fitted
        .into_iter()
        .map(|c| {
            (
                c.text,
                SourceRef {
                    source_file: c.source_file,
                    page_number: c.page_number,
                },
            )
        })
        .unzip();

    RetrievalResult {
        context_text: context_chunks.join(CONTEXT_SEPARATOR),
        context_chunks,
        sources,
    }
}
