//! Embeddings index boundary consumed by retrieval and ingestion.

use std::future::Future;
use std::pin::Pin;

use crate::rag::core::candidate::{ChunkId, Passage};
use crate::rag::core::errors::RagResult;
use crate::rag::core::metadata::StoredMetadata;

/// Boxed future type for embeddings index operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One chunk as written by the ingestion collaborator.
#[derive(Clone, Debug)]
pub struct IndexedChunk {
    /// `{source}_chunk_{index}` identifier.
    pub id: ChunkId,
    /// Passage text.
    pub document: String,
    /// Null-free metadata record.
    pub metadata: StoredMetadata,
    /// Embedding produced by the shared embedder.
    pub embedding: Vec<f64>,
}

/// Single-key equality filter on stored metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataFilter {
    /// `source == value`.
    Source(String),
    /// `workspace == value`.
    Workspace(String),
}

impl MetadataFilter {
    /// Whether a stored record satisfies the filter.
    #[must_use]
    pub fn matches(&self, metadata: &StoredMetadata) -> bool {
        match self {
            Self::Source(source) => metadata.source() == source,
            Self::Workspace(workspace) => metadata.workspace() == workspace,
        }
    }
}

/// Normalize an optional workspace filter: an empty tag means no filter.
#[must_use]
pub fn workspace_filter(workspace: Option<&str>) -> Option<&str> {
    workspace.filter(|ws| !ws.is_empty())
}

/// Vector-similarity store holding the chunk corpus.
pub trait EmbeddingsIndex: Send + Sync {
    /// Insert or replace chunks by id.
    ///
    /// # Errors
    /// Returns an error if the store cannot persist the chunks.
    fn upsert(&self, chunks: Vec<IndexedChunk>) -> StoreFuture<'_, RagResult<()>>;

    /// Nearest neighbours of `embedding`, most similar first.
    ///
    /// When `workspace` is set only chunks tagged with it are considered.
    ///
    /// # Errors
    /// Returns an error if the query cannot be executed.
    fn query<'a>(
        &'a self,
        embedding: &'a [f64],
        n_results: usize,
        workspace: Option<&'a str>,
    ) -> StoreFuture<'a, RagResult<Vec<Passage>>>;

    /// Every stored passage, in a stable order.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn get_all(&self) -> StoreFuture<'_, RagResult<Vec<Passage>>>;

    /// Delete every chunk matching the filter and return how many were removed.
    ///
    /// # Errors
    /// Returns an error if deletion fails.
    fn delete(&self, filter: MetadataFilter) -> StoreFuture<'_, RagResult<usize>>;
}
