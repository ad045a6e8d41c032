//! Chunk metadata stored alongside each vector, and the subject filter.
//!
//! Metadata keys on the wire: `text`, `source_file`, `chunk_index`,
//! `page_number`, `subjects`. The `subjects` field is a list of normalized
//! tags; older records that stored a single comma-separated string are
//! accepted on read and split into tags.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

/// Source file recorded when a record carries none.
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// Normalize a subject tag: trimmed and lowercased.
pub fn normalize_subject(subject: &str) -> String {
    subject.trim().to_lowercase()
}

/// Split a comma-separated subject string into normalized, non-empty tags.
///
/// Repeated tags are dropped; the first occurrence keeps its position.
pub fn parse_subjects(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(normalize_subject)
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Metadata attached to a stored chunk vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Chunk text.
    #[serde(default)]
    pub text: String,

    /// Originating file name.
    #[serde(default = "default_source_file")]
    pub source_file: String,

    /// Position of the chunk within its source.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_count"
    )]
    pub chunk_index: Option<u32>,

    /// Page the chunk came from, when known.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_count"
    )]
    pub page_number: Option<u32>,

    /// Normalized subject tags.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_subjects"
    )]
    pub subjects: Vec<String>,
}

fn default_source_file() -> String {
    UNKNOWN_SOURCE.to_string()
}

impl ChunkMetadata {
    /// Create metadata for a chunk of text from a source file.
    pub fn new(text: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    /// Set the chunk index.
    pub fn with_chunk_index(mut self, chunk_index: u32) -> Self {
        self.chunk_index = Some(chunk_index);
        self
    }

    /// Set the page number.
    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    /// Set subjects from a comma-separated string.
    pub fn with_subjects(mut self, subjects: &str) -> Self {
        self.subjects = parse_subjects(subjects);
        self
    }

    /// Subjects joined for display, `None` when untagged.
    pub fn subjects_label(&self) -> Option<String> {
        if self.subjects.is_empty() {
            None
        } else {
            Some(self.subjects.join(", "))
        }
    }
}

/// Numeric metadata may come back as a float (`3.0`) from JSON stores.
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u32))
}

fn deserialize_subjects<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSubjects {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<RawSubjects>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawSubjects::One(raw)) => parse_subjects(&raw),
        Some(RawSubjects::Many(list)) => parse_subjects(&list.join(",")),
    })
}

/// Restricts query results by metadata.
///
/// Currently a single predicate: the record's `subjects` must contain the
/// normalized subject exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    subject: Option<String>,
}

impl MetadataFilter {
    /// A filter with no restriction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a subject. Blank input leaves the filter unrestricted.
    pub fn with_subject(mut self, subject: &str) -> Self {
        let normalized = normalize_subject(subject);
        self.subject = if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        };
        self
    }

    /// Build from an optional caller-supplied subject.
    pub fn for_subject(subject: Option<&str>) -> Option<Self> {
        let filter = Self::new().with_subject(subject.unwrap_or_default());
        if filter.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
    }

    /// Check a stored record against the filter.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match &self.subject {
            None => true,
            Some(subject) => metadata.subjects.iter().any(|s| s == subject),
        }
    }

    /// Render as a Pinecone-style metadata filter, `None` when unrestricted.
    pub fn to_json_filter(&self) -> Option<serde_json::Value> {
        self.subject
            .as_ref()
            .map(|subject| serde_json::json!({ "subjects": { "$in": [subject] } }))
    }
}
