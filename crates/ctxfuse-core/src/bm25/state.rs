//! Fitted and neutral BM25 state.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use ctxfuse_db::vector::SparseVector;

use super::scorer::{idf, tf_weight, Bm25Params};
use super::tokenizer::{Tokenizer, TokenizerConfig};
use super::{Bm25Config, SparseEncoder};
use crate::errors::FuseError;

/// Tokenizer and scoring settings a state was built with.
#[derive(Debug, Clone, PartialEq, Default, Encode, Decode)]
pub struct Bm25Settings {
    pub params: Bm25Params,
    pub tokenizer: TokenizerConfig,
}

impl From<&Bm25Config> for Bm25Settings {
    fn from(config: &Bm25Config) -> Self {
        Self {
            params: Bm25Params {
                k1: config.k1,
                b: config.b,
            },
            tokenizer: TokenizerConfig {
                stemming: config.stemming,
                remove_stopwords: config.remove_stopwords,
                min_token_length: config.min_token_length,
            },
        }
    }
}

/// Corpus-wide term statistics.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct CorpusStats {
    /// Documents in the fitted corpus.
    pub num_docs: u32,
    /// Total tokens across the corpus.
    pub total_tokens: u64,
    /// Average document length in tokens.
    pub avg_doc_len: f32,
    /// Term index -> number of documents containing it.
    pub doc_freqs: BTreeMap<u32, u32>,
}

impl CorpusStats {
    /// Statistics of one corpus.
    fn collect<S>(corpus: &[S], tokenizer: &TokenizerConfig) -> Self
    where
        S: AsRef<str> + Sync,
    {
        let per_doc: Vec<(Vec<u32>, usize)> = corpus
            .par_iter()
            .map(|doc| {
                Tokenizer::with_cached(tokenizer, |t| {
                    let (tf, len) = t.term_frequencies(doc.as_ref());
                    (tf.into_keys().collect(), len)
                })
            })
            .collect();

        let mut doc_freqs: BTreeMap<u32, u32> = BTreeMap::new();
        let mut total_tokens = 0u64;
        for (terms, len) in &per_doc {
            total_tokens += *len as u64;
            for term in terms {
                *doc_freqs.entry(*term).or_insert(0) += 1;
            }
        }

        let num_docs = corpus.len() as u32;
        Self {
            num_docs,
            total_tokens,
            avg_doc_len: average(total_tokens, num_docs),
            doc_freqs,
        }
    }

    fn merge(&mut self, other: &CorpusStats) {
        self.num_docs += other.num_docs;
        self.total_tokens += other.total_tokens;
        for (term, df) in &other.doc_freqs {
            *self.doc_freqs.entry(*term).or_insert(0) += df;
        }
        self.avg_doc_len = average(self.total_tokens, self.num_docs);
    }
}

fn average(total_tokens: u64, num_docs: u32) -> f32 {
    if num_docs == 0 {
        0.0
    } else {
        (total_tokens as f64 / num_docs as f64) as f32
    }
}

/// Summary of a state, written to the metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25Stats {
    pub fitted: bool,
    pub num_docs: u32,
    pub avg_doc_len: f32,
    pub vocabulary_size: usize,
}

/// BM25 model state.
///
/// `Neutral` stands in when no corpus statistics are available: every
/// document frequency is zero and each document is treated as average length.
/// Both variants encode through [`SparseEncoder`], so callers never branch on
/// which one they hold.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Bm25State {
    Fitted {
        settings: Bm25Settings,
        corpus: CorpusStats,
    },
    Neutral {
        settings: Bm25Settings,
    },
}

impl Bm25State {
    /// A state with no corpus statistics.
    pub fn neutral(config: &Bm25Config) -> Self {
        Self::Neutral {
            settings: Bm25Settings::from(config),
        }
    }

    /// Compute term statistics over a corpus.
    ///
    /// # Errors
    ///
    /// Returns [`FuseError::EmptyCorpus`] if `corpus` has no documents.
    pub fn fit<S>(corpus: &[S], config: &Bm25Config) -> Result<Self, FuseError>
    where
        S: AsRef<str> + Sync,
    {
        if corpus.is_empty() {
            return Err(FuseError::EmptyCorpus);
        }

        let settings = Bm25Settings::from(config);
        let corpus = CorpusStats::collect(corpus, &settings.tokenizer);

        tracing::debug!(
            "Fitted BM25 over {} documents: {} terms, avgdl {:.1}",
            corpus.num_docs,
            corpus.doc_freqs.len(),
            corpus.avg_doc_len
        );

        Ok(Self::Fitted { settings, corpus })
    }

    /// Fold the statistics of `batch` into this state.
    ///
    /// Document counts, token totals and document frequencies add up. A
    /// neutral state, or one built with different settings, is replaced by
    /// `batch` outright. A neutral `batch` changes nothing.
    pub fn merged_with(&self, batch: Bm25State) -> Bm25State {
        match self {
            Self::Fitted { settings, corpus } => match batch {
                Self::Fitted {
                    settings: next,
                    corpus: added,
                } if *settings == next => {
                    let mut merged = corpus.clone();
                    merged.merge(&added);
                    Self::Fitted {
                        settings: next,
                        corpus: merged,
                    }
                }
                Self::Neutral { .. } => self.clone(),
                other => {
                    tracing::warn!(
                        "BM25 settings changed; discarding statistics of {} earlier documents",
                        corpus.num_docs
                    );
                    other
                }
            },
            Self::Neutral { .. } => batch,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted { .. })
    }

    pub fn settings(&self) -> &Bm25Settings {
        match self {
            Self::Fitted { settings, .. } | Self::Neutral { settings } => settings,
        }
    }

    /// Documents containing the term, zero for unseen terms and neutral state.
    pub fn doc_freq(&self, term: u32) -> u32 {
        match self {
            Self::Fitted { corpus, .. } => corpus.doc_freqs.get(&term).copied().unwrap_or(0),
            Self::Neutral { .. } => 0,
        }
    }

    pub fn num_docs(&self) -> u32 {
        match self {
            Self::Fitted { corpus, .. } => corpus.num_docs,
            Self::Neutral { .. } => 0,
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        match self {
            Self::Fitted { corpus, .. } => corpus.doc_freqs.len(),
            Self::Neutral { .. } => 0,
        }
    }

    pub fn stats(&self) -> Bm25Stats {
        Bm25Stats {
            fitted: self.is_fitted(),
            num_docs: self.num_docs(),
            avg_doc_len: match self {
                Self::Fitted { corpus, .. } => corpus.avg_doc_len,
                Self::Neutral { .. } => 0.0,
            },
            vocabulary_size: self.vocabulary_size(),
        }
    }
}

impl SparseEncoder for Bm25State {
    fn encode_queries(&self, text: &str) -> SparseVector {
        let (tf, _) =
            Tokenizer::with_cached(&self.settings().tokenizer, |t| t.term_frequencies(text));
        if tf.is_empty() {
            return SparseVector::empty();
        }

        let num_docs = self.num_docs();
        let mut weights: BTreeMap<u32, f32> = tf
            .into_keys()
            .map(|term| (term, idf(num_docs, self.doc_freq(term))))
            .collect();

        let total: f32 = weights.values().sum();
        if total > 0.0 {
            for value in weights.values_mut() {
                *value /= total;
            }
        }

        SparseVector::from_weights(weights)
    }

    fn encode_documents(&self, text: &str) -> SparseVector {
        let (tf, doc_len) =
            Tokenizer::with_cached(&self.settings().tokenizer, |t| t.term_frequencies(text));
        if tf.is_empty() {
            return SparseVector::empty();
        }

        let params = &self.settings().params;
        let avg_doc_len = match self {
            Self::Fitted { corpus, .. } => corpus.avg_doc_len,
            Self::Neutral { .. } => doc_len as f32,
        };

        let weights: BTreeMap<u32, f32> = tf
            .into_iter()
            .map(|(term, freq)| (term, tf_weight(freq, doc_len, avg_doc_len, params)))
            .collect();

        SparseVector::from_weights(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bm25::{term_index, Tokenizer};
    use std::collections::HashSet;

    /// Sparse index of a word after tokenization.
    fn idx(word: &str) -> u32 {
        let tokens = Tokenizer::default().tokenize(word);
        term_index(&tokens[0])
    }

    fn corpus() -> Vec<&'static str> {
        vec![
            "Opportunity cost is the trade-off between choices.",
            "Market demand rises when prices fall.",
            "Supply and demand set the market price.",
            "Photosynthesis converts light into chemical energy.",
        ]
    }

    #[test]
    fn test_fit_empty_corpus_fails() {
        let empty: Vec<String> = Vec::new();
        let err = Bm25State::fit(&empty, &Bm25Config::default()).unwrap_err();
        assert!(matches!(err, FuseError::EmptyCorpus));
        assert!(err.is_degradable());
    }

    #[test]
    fn test_fit_collects_statistics() {
        let state = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        assert!(state.is_fitted());
        assert_eq!(state.num_docs(), 4);
        assert_eq!(state.doc_freq(idx("market")), 2);
        assert_eq!(state.doc_freq(idx("photosynthesis")), 1);
        assert_eq!(state.doc_freq(idx("unseen")), 0);

        let stats = state.stats();
        assert!(stats.fitted);
        assert!(stats.avg_doc_len > 0.0);
        assert_eq!(stats.vocabulary_size, state.vocabulary_size());
    }

    #[test]
    fn test_merge_keeps_earlier_statistics() {
        let config = Bm25Config::default();
        let first = Bm25State::fit(&corpus()[..2], &config).unwrap();
        let second = Bm25State::fit(&corpus()[2..], &config).unwrap();

        let merged = first.merged_with(second);
        let whole = Bm25State::fit(&corpus(), &config).unwrap();
        assert_eq!(merged, whole);
        assert_eq!(merged.doc_freq(idx("opportunity")), 1);
        assert_eq!(merged.doc_freq(idx("market")), 2);
    }

    #[test]
    fn test_merge_into_neutral_takes_batch() {
        let config = Bm25Config::default();
        let batch = Bm25State::fit(&corpus(), &config).unwrap();
        let merged = Bm25State::neutral(&config).merged_with(batch.clone());
        assert_eq!(merged, batch);

        let unchanged = batch.merged_with(Bm25State::neutral(&config));
        assert_eq!(unchanged, batch);
    }

    #[test]
    fn test_merge_with_changed_settings_replaces() {
        let first = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        let unstemmed = Bm25Config {
            stemming: false,
            ..Default::default()
        };
        let batch = Bm25State::fit(&corpus()[..1], &unstemmed).unwrap();

        let merged = first.merged_with(batch.clone());
        assert_eq!(merged, batch);
        assert_eq!(merged.num_docs(), 1);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let state = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        let a = state.encode_queries("market demand and opportunity cost");
        let b = state.encode_queries("market demand and opportunity cost");
        assert_eq!(a, b);

        let unique: HashSet<u32> = a.indices().iter().copied().collect();
        assert_eq!(unique.len(), a.len());
    }

    #[test]
    fn test_empty_text_encodes_empty() {
        let fitted = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        let neutral = Bm25State::neutral(&Bm25Config::default());
        for state in [&fitted, &neutral] {
            assert!(state.encode_queries("").is_empty());
            assert!(state.encode_documents("").is_empty());
            assert!(state.encode_queries("the of and").is_empty());
        }
    }

    #[test]
    fn test_query_weights_sum_to_one() {
        let state = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        let query = state.encode_queries("market photosynthesis");
        assert_eq!(query.len(), 2);

        let total: f32 = query.values().iter().sum();
        assert!((total - 1.0).abs() < 1e-5);

        // The rarer term carries more weight.
        let weight_of = |term: &str| {
            query
                .iter()
                .find(|(i, _)| *i == idx(term))
                .map(|(_, v)| v)
                .unwrap()
        };
        assert!(weight_of("photosynthesis") > weight_of("market"));
    }

    #[test]
    fn test_neutral_query_is_uniform() {
        let state = Bm25State::neutral(&Bm25Config::default());
        let query = state.encode_queries("market price demand supply");
        assert_eq!(query.len(), 4);
        for value in query.values() {
            assert!((value - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_neutral_document_weights() {
        let state = Bm25State::neutral(&Bm25Config::default());
        let doc = state.encode_documents("market market price");

        let market = doc
            .iter()
            .find(|(i, _)| *i == idx("market"))
            .map(|(_, v)| v)
            .unwrap();
        // tf / (tf + k1)
        assert!((market - 2.0 / 3.2).abs() < 1e-6);
    }

    #[test]
    fn test_fitted_and_neutral_share_index_space() {
        let fitted = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        let neutral = Bm25State::neutral(&Bm25Config::default());

        let a = fitted.encode_queries("opportunity cost");
        let b = neutral.encode_queries("opportunity cost");
        assert_eq!(a.indices(), b.indices());
    }

    #[test]
    fn test_query_matches_relevant_document() {
        let state = Bm25State::fit(&corpus(), &Bm25Config::default()).unwrap();
        let query = state.encode_queries("opportunity cost");

        let relevant = state.encode_documents(corpus()[0]);
        let unrelated = state.encode_documents(corpus()[3]);
        assert!(query.dot(&relevant) > 0.0);
        assert_eq!(query.dot(&unrelated), 0.0);
    }
}
