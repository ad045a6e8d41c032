//! In-process hybrid vector index.
//!
//! Stores records per namespace and answers queries with a linear scan. When
//! configured with a path, every write is persisted to a JSONL file and the
//! file is reloaded on open. Intended for tests, local development and small
//! corpora.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::super::config::VectorIndexConfig;
use super::super::metadata::ChunkMetadata;
use super::super::sparse::SparseVector;
use super::super::traits::{
    DeleteScope, VectorIndexBackend, VectorMatch, VectorMetric, VectorQuery, VectorRecord,
};
use crate::error::{DbError, DbResult};

/// Filename for the JSONL data file.
const DATA_FILENAME: &str = "vectors.jsonl";

/// A stored record, one JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVector {
    namespace: String,
    id: String,
    values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sparse_values: Option<SparseVector>,
    metadata: ChunkMetadata,
}

impl StoredVector {
    fn from_record(namespace: &str, record: &VectorRecord) -> Self {
        Self {
            namespace: namespace.to_string(),
            id: record.id.clone(),
            values: record.values.clone(),
            sparse_values: record.sparse_values.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

type Namespaces = HashMap<String, HashMap<String, StoredVector>>;

/// In-memory hybrid vector index.
pub struct MemoryVectorIndex {
    /// Persistence directory, if any.
    path: Option<PathBuf>,

    /// Dimension of vectors.
    dimension: usize,

    /// Dense metric.
    metric: VectorMetric,

    /// namespace -> id -> record.
    namespaces: RwLock<Namespaces>,
}

impl MemoryVectorIndex {
    /// Create a volatile index.
    pub fn new(dimension: usize, metric: VectorMetric) -> Self {
        Self {
            path: None,
            dimension,
            metric,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Open an index from configuration, loading persisted records if present.
    pub fn open(config: &VectorIndexConfig) -> DbResult<Self> {
        let mut index = Self::new(config.dimension, config.metric);

        if let Some(path) = &config.path {
            debug!("Opening MemoryVectorIndex at {:?}", path);
            fs::create_dir_all(path).map_err(|e| DbError::vector_io(path, e.to_string()))?;
            let data_path = path.join(DATA_FILENAME);
            if data_path.exists() {
                index.load_from_file(&data_path)?;
            }
            index.path = Some(path.clone());
        }

        Ok(index)
    }

    /// Load records from a JSONL file, returning the number of lines skipped.
    fn load_from_file(&self, path: &Path) -> DbResult<usize> {
        debug!("Loading vectors from {:?}", path);

        let file = File::open(path).map_err(|e| DbError::vector_io(path, e.to_string()))?;
        let reader = BufReader::new(file);

        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let mut loaded = 0usize;
        let mut skipped = 0usize;
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DbError::vector_io(path, e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<StoredVector>(&line) {
                Ok(stored) => {
                    namespaces
                        .entry(stored.namespace.clone())
                        .or_default()
                        .insert(stored.id.clone(), stored);
                    loaded += 1;
                }
                Err(e) => {
                    if skipped == 0 {
                        warn!("Invalid record at {:?}:{}: {}", path, line_num + 1, e);
                    }
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} invalid lines in {:?}; {} vectors loaded",
                skipped, path, loaded
            );
        }
        debug!("Loaded {} vectors", loaded);
        Ok(skipped)
    }

    /// Rewrite the JSONL file from the in-memory state.
    fn save_to_file(&self, namespaces: &Namespaces) -> DbResult<()> {
        let Some(dir) = &self.path else {
            return Ok(());
        };
        let data_path = dir.join(DATA_FILENAME);
        trace!("Saving vectors to {:?}", data_path);

        let file =
            File::create(&data_path).map_err(|e| DbError::vector_io(&data_path, e.to_string()))?;
        let mut writer = BufWriter::new(file);
        for stored in namespaces.values().flat_map(|records| records.values()) {
            let line = serde_json::to_string(stored)?;
            writeln!(writer, "{}", line).map_err(|e| DbError::vector_io(&data_path, e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| DbError::vector_io(&data_path, e.to_string()))?;

        Ok(())
    }

    fn hybrid_score(&self, query: &VectorQuery<'_>, stored: &StoredVector) -> f32 {
        let dense = self.metric.score(query.vector, &stored.values);
        let sparse = match (query.sparse_vector, &stored.sparse_values) {
            (Some(q), Some(s)) => q.dot(s),
            _ => 0.0,
        };
        dense + sparse
    }
}

impl VectorIndexBackend for MemoryVectorIndex {
    fn query(&self, query: &VectorQuery<'_>) -> DbResult<Vec<VectorMatch>> {
        trace!(
            "Querying MemoryVectorIndex namespace='{}', top_k={}",
            query.namespace,
            query.top_k
        );

        if query.vector.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: query.vector.len(),
            });
        }

        let namespaces = self
            .namespaces
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let Some(records) = namespaces.get(query.namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &StoredVector)> = records
            .values()
            .filter(|v| query.filter.map(|f| f.matches(&v.metadata)).unwrap_or(true))
            .map(|v| (self.hybrid_score(query, v), v))
            .collect();

        // Sort by score (descending), ties by id for stable output
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        let results: Vec<VectorMatch> = scored
            .into_iter()
            .take(query.top_k)
            .map(|(score, stored)| {
                let m = VectorMatch::new(stored.id.clone(), score);
                if query.include_metadata {
                    m.with_metadata(stored.metadata.clone())
                } else {
                    m
                }
            })
            .collect();

        trace!("Found {} results", results.len());
        Ok(results)
    }

    fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> DbResult<usize> {
        debug!("Upserting {} vectors into '{}'", records.len(), namespace);

        // Validate before taking the lock so a bad batch writes nothing
        for record in records {
            if record.values.len() != self.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.values.len(),
                });
            }
        }

        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), StoredVector::from_record(namespace, record));
        }

        self.save_to_file(&namespaces)?;
        Ok(records.len())
    }

    fn delete(&self, namespace: &str, scope: DeleteScope) -> DbResult<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        match scope {
            DeleteScope::All => {
                let removed = namespaces.remove(namespace).map(|r| r.len()).unwrap_or(0);
                debug!("Deleted all {} vectors in '{}'", removed, namespace);
            }
            DeleteScope::Ids(ids) => {
                if let Some(records) = namespaces.get_mut(namespace) {
                    for id in &ids {
                        records.remove(id);
                    }
                }
                debug!("Deleted {} vector ids in '{}'", ids.len(), namespace);
            }
        }

        self.save_to_file(&namespaces)
    }

    fn len(&self, namespace: &str) -> DbResult<usize> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        Ok(namespaces.get(namespace).map(|r| r.len()).unwrap_or(0))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::MetadataFilter;
    use tempfile::TempDir;

    fn record(id: &str, values: Vec<f32>, text: &str, subjects: &str) -> VectorRecord {
        VectorRecord::new(
            id,
            values,
            ChunkMetadata::new(text, format!("{}.pdf", id)).with_subjects(subjects),
        )
    }

    #[test]
    fn test_query_orders_by_score() {
        let index = MemoryVectorIndex::new(2, VectorMetric::DotProduct);
        index
            .upsert(
                "ns",
                &[
                    record("a", vec![0.1, 0.0], "low", "general"),
                    record("b", vec![0.9, 0.0], "high", "general"),
                    record("c", vec![0.5, 0.0], "mid", "general"),
                ],
            )
            .unwrap();

        let q = [1.0, 0.0];
        let matches = index
            .query(&VectorQuery::new(&q, 2).with_namespace("ns"))
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "b");
        assert_eq!(matches[1].id, "c");
        assert_eq!(matches[0].metadata.as_ref().unwrap().text, "high");
    }

    #[test]
    fn test_sparse_contributes_to_score() {
        let index = MemoryVectorIndex::new(1, VectorMetric::DotProduct);
        let lexical = SparseVector::new(vec![42], vec![1.0]).unwrap();
        index
            .upsert(
                "ns",
                &[
                    record("dense", vec![0.5], "a", ""),
                    record("both", vec![0.5], "b", "").with_sparse(lexical.clone()),
                ],
            )
            .unwrap();

        let q = [1.0];
        let query_sparse = SparseVector::new(vec![42], vec![0.3]).unwrap();
        let matches = index
            .query(
                &VectorQuery::new(&q, 10)
                    .with_namespace("ns")
                    .with_sparse(&query_sparse),
            )
            .unwrap();

        assert_eq!(matches[0].id, "both");
        assert!((matches[0].score - 0.8).abs() < 1e-6);
        assert!((matches[1].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_subject_filter() {
        let index = MemoryVectorIndex::new(1, VectorMetric::DotProduct);
        index
            .upsert(
                "ns",
                &[
                    record("econ", vec![0.2], "supply", "Economics"),
                    record("bio", vec![0.9], "cells", "Biology"),
                ],
            )
            .unwrap();

        let q = [1.0];
        let filter = MetadataFilter::new().with_subject(" ECONOMICS ");
        let matches = index
            .query(
                &VectorQuery::new(&q, 10)
                    .with_namespace("ns")
                    .with_filter(Some(&filter)),
            )
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "econ");
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let index = MemoryVectorIndex::new(1, VectorMetric::DotProduct);
        index.upsert("one", &[record("a", vec![1.0], "x", "")]).unwrap();

        let q = [1.0];
        assert!(index
            .query(&VectorQuery::new(&q, 5).with_namespace("two"))
            .unwrap()
            .is_empty());
        assert_eq!(index.len("one").unwrap(), 1);
        assert!(index.is_empty("two").unwrap());
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = MemoryVectorIndex::new(3, VectorMetric::DotProduct);
        let err = index
            .upsert("ns", &[record("a", vec![1.0], "x", "")])
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_delete_all_and_ids() {
        let index = MemoryVectorIndex::new(1, VectorMetric::DotProduct);
        index
            .upsert(
                "ns",
                &[record("a", vec![1.0], "x", ""), record("b", vec![1.0], "y", "")],
            )
            .unwrap();

        index
            .delete("ns", DeleteScope::Ids(vec!["a".to_string()]))
            .unwrap();
        assert_eq!(index.len("ns").unwrap(), 1);

        index.delete("ns", DeleteScope::All).unwrap();
        assert_eq!(index.len("ns").unwrap(), 0);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config = VectorIndexConfig::memory(2).with_path(temp_dir.path());

        {
            let index = MemoryVectorIndex::open(&config).unwrap();
            index
                .upsert(
                    "ns",
                    &[record("a", vec![1.0, 0.0], "persisted", "economics")
                        .with_sparse(SparseVector::new(vec![7], vec![0.4]).unwrap())],
                )
                .unwrap();
        }

        let reopened = MemoryVectorIndex::open(&config).unwrap();
        assert_eq!(reopened.len("ns").unwrap(), 1);

        let q = [1.0, 0.0];
        let matches = reopened
            .query(&VectorQuery::new(&q, 1).with_namespace("ns"))
            .unwrap();
        let meta = matches[0].metadata.as_ref().unwrap();
        assert_eq!(meta.text, "persisted");
        assert_eq!(meta.subjects, vec!["economics"]);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let config = VectorIndexConfig::memory(2).with_path(temp_dir.path());

        {
            let index = MemoryVectorIndex::open(&config).unwrap();
            index
                .upsert("ns", &[record("a", vec![1.0, 0.0], "kept", "economics")])
                .unwrap();
        }

        let data_path = temp_dir.path().join(DATA_FILENAME);
        let mut contents = fs::read_to_string(&data_path).unwrap();
        contents.push_str("{not json\n\n{\"id\": 3}\n");
        fs::write(&data_path, contents).unwrap();

        let fresh = MemoryVectorIndex::new(2, VectorMetric::DotProduct);
        assert_eq!(fresh.load_from_file(&data_path).unwrap(), 2);
        assert_eq!(fresh.len("ns").unwrap(), 1);

        let reopened = MemoryVectorIndex::open(&config).unwrap();
        assert_eq!(reopened.len("ns").unwrap(), 1);
    }

    #[test]
    fn test_query_without_metadata() {
        let index = MemoryVectorIndex::new(1, VectorMetric::DotProduct);
        index.upsert("ns", &[record("a", vec![1.0], "x", "")]).unwrap();

        let q = [1.0];
        let matches = index
            .query(&VectorQuery::new(&q, 1).with_namespace("ns").with_metadata(false))
            .unwrap();
        assert!(matches[0].metadata.is_none());
    }
}
