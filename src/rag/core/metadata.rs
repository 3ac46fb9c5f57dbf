//! Chunk metadata and its null-free storage shape.
//!
//! Chunk metadata is produced by the ingestion collaborator and read back by
//! retrieval. The embeddings index refuses null values, so every record is
//! normalized into [`StoredMetadata`] before it is written: absent values
//! become the empty string sentinel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rag::core::errors::{RagError, RagResult};

/// Key holding the document path.
pub const KEY_SOURCE: &str = "source";
/// Key holding the workspace tag.
pub const KEY_WORKSPACE: &str = "workspace";
/// Key holding the chunk position within its document.
pub const KEY_CHUNK_INDEX: &str = "chunk_index";
/// Key holding the character offset within the source text.
pub const KEY_START_INDEX: &str = "start_index";
/// Key flagging a document summary chunk.
pub const KEY_IS_SUMMARY: &str = "is_summary";

/// Sentinel written in place of an absent value.
pub const EMPTY_SENTINEL: &str = "";

/// Typed metadata for one indexed passage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Document path or key.
    pub source: String,
    /// Workspace tag, `None` when the document is unscoped.
    pub workspace: Option<String>,
    /// Position of the chunk within its document.
    pub chunk_index: Option<i64>,
    /// Character offset of the chunk within the source text.
    pub start_index: Option<i64>,
    /// Whether the chunk is a generated document summary.
    pub is_summary: Option<bool>,
}

impl ChunkMetadata {
    /// Create metadata for a source with no optional fields set.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Set the workspace tag.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Set the chunk position.
    #[must_use]
    pub const fn with_chunk_index(mut self, chunk_index: i64) -> Self {
        self.chunk_index = Some(chunk_index);
        self
    }

    /// Set the character offset.
    #[must_use]
    pub const fn with_start_index(mut self, start_index: i64) -> Self {
        self.start_index = Some(start_index);
        self
    }

    /// Mark the chunk as a summary.
    #[must_use]
    pub const fn summary(mut self) -> Self {
        self.is_summary = Some(true);
        self
    }

    /// Workspace tag if set and non-empty.
    #[must_use]
    pub fn workspace_tag(&self) -> Option<&str> {
        self.workspace.as_deref().filter(|ws| !ws.is_empty())
    }

    /// Shape the record written for chunk `chunk_index` of a document.
    ///
    /// Chunks that carry a `start_index` get the compact record
    /// `{source, chunk_index, start_index, workspace}`. Otherwise every known
    /// field is kept, `chunk_index` is replaced and no `start_index` key is
    /// written.
    #[must_use]
    pub fn to_stored(&self, chunk_index: i64, workspace: Option<&str>) -> StoredMetadata {
        let workspace = workspace.map_or_else(String::new, str::to_string);
        let mut entries = BTreeMap::new();
        entries.insert(KEY_SOURCE.to_string(), MetadataValue::from(self.source.as_str()));
        entries.insert(KEY_CHUNK_INDEX.to_string(), MetadataValue::Int(chunk_index));
        entries.insert(KEY_WORKSPACE.to_string(), MetadataValue::Str(workspace));

        match self.start_index {
            Some(start_index) => {
                entries.insert(KEY_START_INDEX.to_string(), MetadataValue::Int(start_index));
            }
            None => {
                if let Some(is_summary) = self.is_summary {
                    entries.insert(KEY_IS_SUMMARY.to_string(), MetadataValue::Bool(is_summary));
                }
            }
        }

        StoredMetadata { entries }
    }
}

/// Scalar metadata value accepted by the embeddings index.
///
/// There is deliberately no null variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Text value, possibly the empty sentinel.
    Str(String),
}

impl MetadataValue {
    /// Text content if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            Self::Bool(_) | Self::Int(_) => None,
        }
    }

    const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int(_) | Self::Str(_) => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<Option<&str>> for MetadataValue {
    fn from(value: Option<&str>) -> Self {
        Self::Str(value.unwrap_or(EMPTY_SENTINEL).to_string())
    }
}

/// Null-free metadata mapping as written to the embeddings index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredMetadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl StoredMetadata {
    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.entries.iter()
    }

    /// Source value, or the empty sentinel.
    #[must_use]
    pub fn source(&self) -> &str {
        self.get(KEY_SOURCE)
            .and_then(MetadataValue::as_str)
            .unwrap_or(EMPTY_SENTINEL)
    }

    /// Workspace value, or the empty sentinel.
    #[must_use]
    pub fn workspace(&self) -> &str {
        self.get(KEY_WORKSPACE)
            .and_then(MetadataValue::as_str)
            .unwrap_or(EMPTY_SENTINEL)
    }

    /// Read the record back into typed metadata.
    ///
    /// # Errors
    /// Returns an error if `source` is missing or a known key has the wrong type.
    pub fn to_metadata(&self) -> RagResult<ChunkMetadata> {
        let source = self
            .get(KEY_SOURCE)
            .and_then(MetadataValue::as_str)
            .ok_or_else(|| RagError::InvalidMetadata("missing source".to_string()))?
            .to_string();
        let workspace = match self.get(KEY_WORKSPACE) {
            None => None,
            Some(value) => {
                let ws = value
                    .as_str()
                    .ok_or_else(|| RagError::InvalidMetadata("workspace is not text".to_string()))?;
                (!ws.is_empty()).then(|| ws.to_string())
            }
        };

        Ok(ChunkMetadata {
            source,
            workspace,
            chunk_index: self.int_field(KEY_CHUNK_INDEX)?,
            start_index: self.int_field(KEY_START_INDEX)?,
            is_summary: self.bool_field(KEY_IS_SUMMARY)?,
        })
    }

    fn int_field(&self, key: &str) -> RagResult<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(MetadataValue::Str(value)) if value.is_empty() => Ok(None),
            Some(value) => value
                .as_int()
                .map(Some)
                .ok_or_else(|| RagError::InvalidMetadata(format!("{key} is not an integer"))),
        }
    }

    fn bool_field(&self, key: &str) -> RagResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(MetadataValue::Str(value)) if value.is_empty() => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| RagError::InvalidMetadata(format!("{key} is not a boolean"))),
        }
    }
}
