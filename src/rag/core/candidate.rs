//! Passages and the candidate types that flow through one retrieval call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rag::core::errors::RetrievalPath;
use crate::rag::core::metadata::ChunkMetadata;

/// Stable chunk identifier, `{source}_chunk_{index}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Build the identifier for chunk `index` of `source`.
    #[must_use]
    pub fn for_chunk(source: &str, index: usize) -> Self {
        Self(format!("{source}_chunk_{index}"))
    }

    /// Borrow as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A passage and its metadata as held by the embeddings index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text.
    pub text: String,
    /// Read-only metadata.
    pub metadata: ChunkMetadata,
}

impl Passage {
    /// Create a passage.
    #[must_use]
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// A passage proposed by one of the retrieval paths.
///
/// Identity is the passage text: two candidates with equal text are the same
/// candidate whatever their metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Passage text and metadata.
    pub passage: Passage,
    /// Path that contributed this candidate.
    #[serde(skip)]
    pub origin: Option<RetrievalPath>,
}

impl Candidate {
    /// Candidate contributed by the given path.
    #[must_use]
    pub const fn from_path(passage: Passage, path: RetrievalPath) -> Self {
        Self {
            passage,
            origin: Some(path),
        }
    }

    /// Passage text, the deduplication key.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.passage.text
    }

    /// Passage metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ChunkMetadata {
        &self.passage.metadata
    }
}

/// A candidate with its reranker score. Lives for one retrieval call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Reranker relevance score. Only relative order is meaningful.
    pub score: f64,
    /// Scored candidate.
    pub candidate: Candidate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        let id = ChunkId::for_chunk("documents/rh/guide.pdf", 7);
        assert_eq!(id.as_str(), "documents/rh/guide.pdf_chunk_7");
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_candidate_accessors() {
        let passage = Passage::new("texte", ChunkMetadata::new("a.md"));
        let candidate = Candidate::from_path(passage, RetrievalPath::Lexical);
        assert_eq!(candidate.text(), "texte");
        assert_eq!(candidate.metadata().source, "a.md");
        assert_eq!(candidate.origin, Some(RetrievalPath::Lexical));
    }
}
