//! Process-wide BM25 state cell.

use std::sync::{Arc, RwLock};

use super::state::Bm25State;
use super::Bm25Config;
use crate::errors::FuseError;

/// Holds the current BM25 snapshot.
///
/// Readers take an `Arc` of the snapshot and keep it for the whole query.
/// Refits build the replacement outside the lock and swap the reference, so a
/// reader never sees a half-built state. Clones share the same cell.
#[derive(Debug, Clone)]
pub struct SharedBm25State {
    cell: Arc<RwLock<Arc<Bm25State>>>,
}

impl SharedBm25State {
    pub fn new(state: Bm25State) -> Self {
        Self {
            cell: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    /// A cell starting from neutral statistics.
    pub fn neutral(config: &Bm25Config) -> Self {
        Self::new(Bm25State::neutral(config))
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Bm25State> {
        // A poisoned lock still holds a complete Arc.
        let guard = self.cell.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Replace the current snapshot, returning the previous one.
    pub fn publish(&self, state: Bm25State) -> Arc<Bm25State> {
        let next = Arc::new(state);
        let mut guard = self.cell.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    /// Fit over `corpus` and publish the result.
    ///
    /// On error the current snapshot stays in place.
    pub fn refit<S>(&self, corpus: &[S], config: &Bm25Config) -> Result<Arc<Bm25State>, FuseError>
    where
        S: AsRef<str> + Sync,
    {
        let state = Bm25State::fit(corpus, config)?;
        self.publish(state);
        Ok(self.snapshot())
    }

    /// Add the statistics of `corpus` to the current snapshot and publish
    /// the merged state.
    ///
    /// Tokenization runs outside the lock; only the merge holds it, so
    /// concurrent calls never lose each other's documents.
    pub fn absorb<S>(&self, corpus: &[S], config: &Bm25Config) -> Result<Arc<Bm25State>, FuseError>
    where
        S: AsRef<str> + Sync,
    {
        let batch = Bm25State::fit(corpus, config)?;
        let mut guard = self.cell.write().unwrap_or_else(|e| e.into_inner());
        let merged = Arc::new(guard.merged_with(batch));
        *guard = Arc::clone(&merged);
        Ok(merged)
    }
}
