//! BM25 state serialization and storage.
//!
//! Uses bincode v2 behind a small header:
//!
//! ```text
//! b"CFBM" | format version (u32 LE) | bincode(Bm25State)
//! ```
//!
//! On disk the blob sits next to a JSON sidecar:
//!
//! ```text
//! <state_path>            # header + bincode body
//! <state_path>.meta.json  # version, stats, built_at
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use bincode::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Bm25State, Bm25Stats};
use super::Bm25Config;
use crate::errors::FuseError;

const MAGIC: &[u8; 4] = b"CFBM";

/// Current on-disk format version.
pub const STATE_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = MAGIC.len() + 4;

/// Sidecar metadata for a persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25StateMeta {
    pub version: u32,
    pub stats: Bm25Stats,
    pub built_at: DateTime<Utc>,
}

impl Bm25StateMeta {
    pub fn new(stats: Bm25Stats) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            stats,
            built_at: Utc::now(),
        }
    }
}

/// Path of the metadata sidecar for a state file.
pub fn meta_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".meta.json");
    state_path.with_file_name(name)
}

/// Serialize a state to bytes.
pub fn save(state: &Bm25State) -> Result<Vec<u8>, FuseError> {
    let body = bincode::encode_to_vec(state, config::standard()).map_err(|e| {
        FuseError::StateSave {
            target: "bytes".to_string(),
            message: format!("Failed to serialize BM25 state: {}", e),
        }
    })?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&STATE_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Deserialize a state from bytes produced by [`save`].
///
/// # Errors
///
/// Returns [`FuseError::StateLoad`] for a bad header, an unknown version,
/// or a body that does not decode cleanly.
pub fn load(bytes: &[u8]) -> Result<Bm25State, FuseError> {
    load_from(bytes, "bytes")
}

fn load_from(bytes: &[u8], source_name: &str) -> Result<Bm25State, FuseError> {
    let state_load = |message: String| FuseError::StateLoad {
        source_name: source_name.to_string(),
        message,
    };

    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(state_load("not a BM25 state (bad header)".to_string()));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != STATE_FORMAT_VERSION {
        return Err(state_load(format!(
            "format version {} is not supported (expected {})",
            version, STATE_FORMAT_VERSION
        )));
    }

    let body = &bytes[HEADER_LEN..];
    let (state, read): (Bm25State, usize) =
        bincode::decode_from_slice(body, config::standard())
            .map_err(|e| state_load(format!("Failed to deserialize BM25 state: {}", e)))?;

    if read != body.len() {
        return Err(state_load(format!(
            "{} trailing bytes after state",
            body.len() - read
        )));
    }

    Ok(state)
}

/// Save a state and its metadata sidecar.
///
/// Creates the parent directory if needed.
pub fn save_state_file(state: &Bm25State, path: &Path) -> Result<(), FuseError> {
    let save_err = |target: &Path, message: String| FuseError::StateSave {
        target: target.display().to_string(),
        message,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            save_err(parent, format!("Failed to create state directory: {}", e))
        })?;
    }

    let bytes = save(state)?;
    fs::write(path, bytes)
        .map_err(|e| save_err(path, format!("Failed to write BM25 state: {}", e)))?;

    let meta = Bm25StateMeta::new(state.stats());
    let meta_file = meta_path(path);
    let meta_json = serde_json::to_string_pretty(&meta)
        .map_err(|e| save_err(&meta_file, format!("Failed to serialize metadata: {}", e)))?;
    fs::write(&meta_file, meta_json)
        .map_err(|e| save_err(&meta_file, format!("Failed to write metadata: {}", e)))?;

    tracing::debug!(
        "Saved BM25 state to {}: {} docs, {} terms",
        path.display(),
        state.num_docs(),
        state.vocabulary_size()
    );

    Ok(())
}

/// Load a state saved with [`save_state_file`].
///
/// A missing file is an error here; see [`load_or_neutral`] for the
/// fallback policy.
pub fn load_state_file(path: &Path) -> Result<Bm25State, FuseError> {
    let source_name = path.display().to_string();

    let meta_file = meta_path(path);
    if meta_file.exists() {
        let meta = load_meta(path)?;
        if meta.version != STATE_FORMAT_VERSION {
            return Err(FuseError::StateLoad {
                source_name,
                message: format!(
                    "metadata version {} is not supported (expected {})",
                    meta.version, STATE_FORMAT_VERSION
                ),
            });
        }
    }

    let bytes = fs::read(path).map_err(|e| FuseError::StateLoad {
        source_name: source_name.clone(),
        message: format!("Failed to read BM25 state: {}", e),
    })?;
    let state = load_from(&bytes, &source_name)?;

    tracing::debug!(
        "Loaded BM25 state from {}: {} docs, {} terms",
        path.display(),
        state.num_docs(),
        state.vocabulary_size()
    );

    Ok(state)
}

/// Read only the metadata sidecar.
pub fn load_meta(path: &Path) -> Result<Bm25StateMeta, FuseError> {
    let meta_file = meta_path(path);
    let source_name = meta_file.display().to_string();

    let content = fs::read_to_string(&meta_file).map_err(|e| FuseError::StateLoad {
        source_name: source_name.clone(),
        message: format!("Failed to read BM25 metadata: {}", e),
    })?;

    serde_json::from_str(&content).map_err(|e| FuseError::StateLoad {
        source_name,
        message: format!("Failed to parse BM25 metadata: {}", e),
    })
}

/// Load a persisted state, substituting a neutral one if it is missing or
/// corrupt.
pub fn load_or_neutral(path: &Path, config: &Bm25Config) -> Bm25State {
    match load_state_file(path) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("{}; lexical scoring falls back to neutral statistics", e);
            Bm25State::neutral(config)
        }
    }
}
