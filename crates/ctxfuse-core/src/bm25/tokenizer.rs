//! Unicode-aware tokenizer and term hashing for BM25.
//!
//! Text goes through:
//! - Unicode word segmentation
//! - Case folding (lowercasing)
//! - Alphabetic filter (pure numbers are dropped)
//! - Minimum token length
//! - Stop word removal
//! - English Snowball stemming
//!
//! Each surviving token is mapped to a sparse index with [`term_index`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use bincode::{Decode, Encode};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TokenizerConfig {
    /// Apply English stemming to tokens.
    pub stemming: bool,
    /// Remove common stop words.
    pub remove_stopwords: bool,
    /// Minimum token length to include.
    pub min_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            remove_stopwords: true,
            min_token_length: 2,
        }
    }
}

/// Stable sparse index for a processed token.
///
/// First four bytes of the token's BLAKE3 digest, little-endian. Independent
/// of corpus and process, so query and document vectors share one index space.
pub fn term_index(token: &str) -> u32 {
    let digest = blake3::hash(token.as_bytes());
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

static STOPWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();

thread_local! {
    /// Last tokenizer built on this thread, reused while its config matches.
    static CACHED_TOKENIZER: RefCell<Option<Tokenizer>> = const { RefCell::new(None) };
}

/// Unicode-aware tokenizer with optional stemming.
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: &'static HashSet<&'static str>,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let stemmer = if config.stemming {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        };

        Self {
            config,
            stemmer,
            stopwords: STOPWORDS.get_or_init(Self::default_stopwords),
        }
    }

    /// Run `f` with a tokenizer for `config`.
    ///
    /// The tokenizer is kept per thread and rebuilt only when `config`
    /// differs from the previous call on that thread.
    pub fn with_cached<R>(config: &TokenizerConfig, f: impl FnOnce(&Tokenizer) -> R) -> R {
        CACHED_TOKENIZER.with(|cell| {
            let tokenizer = match cell.take() {
                Some(cached) if cached.config == *config => cached,
                _ => Tokenizer::new(config.clone()),
            };
            let out = f(&tokenizer);
            cell.replace(Some(tokenizer));
            out
        })
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize text into processed tokens, in reading order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .filter_map(|word| self.process_token(word))
            .collect()
    }

    /// Term frequencies keyed by [`term_index`], plus the token count.
    ///
    /// Tokens whose hashes collide share one entry.
    pub fn term_frequencies(&self, text: &str) -> (BTreeMap<u32, u32>, usize) {
        let tokens = self.tokenize(text);
        let mut tf: BTreeMap<u32, u32> = BTreeMap::new();
        for token in &tokens {
            *tf.entry(term_index(token)).or_insert(0) += 1;
        }
        (tf, tokens.len())
    }

    fn process_token(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();

        if !lower.chars().any(|c| c.is_alphabetic()) {
            return None;
        }

        if lower.chars().count() < self.config.min_token_length {
            return None;
        }

        if self.config.remove_stopwords && self.stopwords.contains(lower.as_str()) {
            return None;
        }

        let token = match &self.stemmer {
            Some(stemmer) => stemmer.stem(&lower).into_owned(),
            None => lower,
        };

        // Some stems fall under the minimum length.
        if token.chars().count() < self.config.min_token_length {
            return None;
        }

        Some(token)
    }

    /// English stop words for prose retrieval.
    fn default_stopwords() -> HashSet<&'static str> {
        [
            // Articles
            "a", "an", "the", // Prepositions
            "in", "on", "at", "to", "of", "with", "by", "from", "as", "into", "through", "during",
            "before", "after", "above", "below", "between", "under", "over", "out", "up", "down",
            "off", "for", "about", // Conjunctions
            "and", "or", "but", "nor", "so", "yet", "if", "because", "while", // Pronouns
            "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
            "your", "his", "its", "our", "their", "this", "that", "these", "those", "which", "who",
            "whom", "whose", "what", "where", "when", "how", "why", // Auxiliaries
            "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
            "do", "does", "did", "doing", "will", "would", "could", "should", "may", "might",
            "must", "shall", "can", // Other common words
            "not", "no", "all", "any", "both", "each", "few", "more", "most", "other", "some",
            "such", "than", "too", "very", "just", "also", "only", "own", "same", "then",
            "there", "here", "whether",
        ]
        .into_iter()
        .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("Opportunity Cost");

        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains(&"cost".to_string()));
    }

    #[test]
    fn test_stopword_removal() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("the cost of the trade");

        assert!(!tokens.iter().any(|t| t == "the" || t == "of"));
        assert!(tokens.contains(&"cost".to_string()));
        assert!(tokens.contains(&"trade".to_string()));
    }

    #[test]
    fn test_cached_tokenizer_follows_config() {
        let stemmed = TokenizerConfig::default();
        let plain = TokenizerConfig {
            stemming: false,
            ..Default::default()
        };

        for _ in 0..2 {
            let a = Tokenizer::with_cached(&stemmed, |t| t.tokenize("running costs"));
            let b = Tokenizer::with_cached(&plain, |t| t.tokenize("running costs"));
            assert_eq!(a, vec!["run", "cost"]);
            assert_eq!(b, vec!["running", "costs"]);
        }

        let config = Tokenizer::with_cached(&plain, |t| t.config().clone());
        assert_eq!(config, plain);
    }

    #[test]
    fn test_stopwords_built_once() {
        let a = Tokenizer::default();
        let b = Tokenizer::new(TokenizerConfig {
            stemming: false,
            ..Default::default()
        });
        assert!(std::ptr::eq(a.stopwords, b.stopwords));
    }

    #[test]
    fn test_stemming() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("running runs");

        assert_eq!(tokens, vec!["run".to_string(), "run".to_string()]);
    }

    #[test]
    fn test_no_stemming() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            stemming: false,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("running runs runner");

        assert_eq!(tokens, vec!["running", "runs", "runner"]);
    }

    #[test]
    fn test_numbers_and_short_tokens_dropped() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("x 42 1999 market");

        assert_eq!(tokens, vec!["market".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        let tokenizer = Tokenizer::default();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   \n\t").is_empty());

        let (tf, len) = tokenizer.term_frequencies("the of and");
        assert!(tf.is_empty());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_term_frequencies() {
        let tokenizer = Tokenizer::default();
        let (tf, len) = tokenizer.term_frequencies("market price market demand market");

        assert_eq!(len, 5);
        assert_eq!(tf.get(&term_index("market")), Some(&3));
        assert_eq!(tf.get(&term_index("price")), Some(&1));
    }

    #[test]
    fn test_term_index_is_stable() {
        assert_eq!(term_index("market"), term_index("market"));
        assert_ne!(term_index("market"), term_index("price"));
    }

    #[test]
    fn test_unicode_text() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("café naïve résumé");

        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().any(|t| t.contains("caf")));
    }
}
