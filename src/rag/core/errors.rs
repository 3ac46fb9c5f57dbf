//! Error types for the retrieval subsystem.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Retrieval subsystem error type.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid chunk handed over by the ingestion collaborator.
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),
    /// Stored metadata that cannot be read back into a record.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// Embeddings index returned something unusable.
    #[error("embeddings index error: {0}")]
    EmbeddingsIndex(String),
    /// Reranker failed to score a batch.
    #[error("reranker error: {0}")]
    Rerank(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] rig::embeddings::EmbeddingError),
    /// HTTP client error from Rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// HTTP error from a provider call.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Invalid token pattern.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for retrieval operations.
pub type RagResult<T> = Result<T, RagError>;

/// One of the two independent candidate sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPath {
    /// Nearest-neighbour search over the embeddings index.
    Vector,
    /// BM25 scoring over the corpus snapshot.
    Lexical,
}

impl RetrievalPath {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Lexical => "lexical",
        }
    }
}

impl fmt::Display for RetrievalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single retrieval path.
///
/// The orchestrator recovers from these locally: the path contributes no
/// candidates and the other path carries the call.
#[derive(Debug, Error)]
#[error("{path} retrieval path failed: {source}")]
pub struct PathError {
    /// Which path failed.
    pub path: RetrievalPath,
    /// Underlying cause.
    #[source]
    pub source: RagError,
}

impl PathError {
    /// Wrap a cause for the vector path.
    #[must_use]
    pub const fn vector(source: RagError) -> Self {
        Self {
            path: RetrievalPath::Vector,
            source,
        }
    }

    /// Wrap a cause for the lexical path.
    #[must_use]
    pub const fn lexical(source: RagError) -> Self {
        Self {
            path: RetrievalPath::Lexical,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_display_names_path() {
        let err = PathError::vector(RagError::EmbeddingsIndex("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "vector retrieval path failed: embeddings index error: timeout"
        );
        assert_eq!(err.path, RetrievalPath::Vector);
    }

    #[test]
    fn test_path_labels() {
        assert_eq!(RetrievalPath::Lexical.to_string(), "lexical");
        assert_eq!(RetrievalPath::Vector.as_str(), "vector");
    }
}
