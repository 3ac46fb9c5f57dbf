//! Writing pre-chunked documents into the embeddings index.
//!
//! Loading and splitting documents happens upstream; this module receives the
//! chunks of one document, shapes their metadata, embeds them with the shared
//! embedder and upserts them.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::rag::core::candidate::ChunkId;
use crate::rag::core::errors::{RagError, RagResult};
use crate::rag::core::metadata::ChunkMetadata;
use crate::rag::embedding::embedder::{Embedder, ensure_batch};
use crate::rag::storage::embeddings_index::{
    EmbeddingsIndex, IndexedChunk, MetadataFilter, workspace_filter,
};

/// One chunk produced by the upstream splitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceChunk {
    /// Chunk text.
    pub text: String,
    /// Character offset within the source document, when the splitter tracks it.
    pub start_index: Option<i64>,
}

impl SourceChunk {
    /// Chunk without an offset.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_index: None,
        }
    }

    /// Chunk at a known character offset.
    #[must_use]
    pub fn at(text: impl Into<String>, start_index: i64) -> Self {
        Self {
            text: text.into(),
            start_index: Some(start_index),
        }
    }
}

/// Result of indexing one document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Document path or key.
    pub source: String,
    /// Workspace the chunks were tagged with.
    pub workspace: Option<String>,
    /// Chunks written to the index.
    pub indexed: usize,
    /// Whitespace-only chunks that were dropped.
    pub skipped: usize,
}

/// Embeds and stores document chunks.
#[derive(Clone)]
pub struct ChunkIndexer {
    index: Arc<dyn EmbeddingsIndex>,
    embedder: Arc<dyn Embedder>,
}

impl ChunkIndexer {
    /// Create an indexer over the index and embedder used at query time.
    #[must_use]
    pub fn new(index: Arc<dyn EmbeddingsIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Index the chunks of one document.
    ///
    /// A summary, when given, is stored first as chunk `0` flagged
    /// `is_summary`. Chunk ids are `{source}_chunk_{i}` where `i` is the
    /// position in that combined list. Chunks already stored for `source` are
    /// deleted once the new batch has been embedded, so re-ingesting a
    /// document leaves only its new chunks.
    ///
    /// # Errors
    /// Returns an error if `source` is empty, embedding fails, an embedding
    /// has the wrong dimensionality, or the index rejects the batch.
    pub async fn ingest_document(
        &self,
        source: &str,
        workspace: Option<&str>,
        chunks: Vec<SourceChunk>,
        summary: Option<String>,
    ) -> RagResult<IngestReport> {
        if source.trim().is_empty() {
            return Err(RagError::InvalidChunk("source must not be empty".to_string()));
        }
        let workspace = workspace_filter(workspace);

        let entries: Vec<(ChunkMetadata, String)> = summary
            .map(|text| (ChunkMetadata::new(source).summary(), text))
            .into_iter()
            .chain(chunks.into_iter().map(|chunk| {
                let mut meta = ChunkMetadata::new(source);
                meta.start_index = chunk.start_index;
                (meta, chunk.text)
            }))
            .collect();

        let mut skipped = 0;
        let mut kept = Vec::with_capacity(entries.len());
        for (position, (meta, text)) in entries.into_iter().enumerate() {
            if text.trim().is_empty() {
                skipped += 1;
                continue;
            }
            let chunk_index = i64::try_from(position)
                .map_err(|_| RagError::InvalidChunk("too many chunks".to_string()))?;
            kept.push((position, meta.to_stored(chunk_index, workspace), text));
        }

        let mut report = IngestReport {
            source: source.to_string(),
            workspace: workspace.map(str::to_string),
            indexed: 0,
            skipped,
        };
        if kept.is_empty() {
            let replaced = self.clear_source(source).await?;
            debug!(source, skipped, replaced, "nothing to index");
            return Ok(report);
        }

        let texts: Vec<String> = kept.iter().map(|(_, _, text)| text.clone()).collect();
        let embeddings = self.embedder.embed_texts(texts).await?;
        ensure_batch(&embeddings, kept.len(), self.embedder.ndims())?;

        let batch: Vec<IndexedChunk> = kept
            .into_iter()
            .zip(embeddings)
            .map(|((position, metadata, document), embedding)| IndexedChunk {
                id: ChunkId::for_chunk(source, position),
                document,
                metadata,
                embedding: embedding.vec,
            })
            .collect();

        report.indexed = batch.len();
        let replaced = self.clear_source(source).await?;
        self.index.upsert(batch).await?;
        info!(
            source,
            workspace = workspace.unwrap_or(""),
            indexed = report.indexed,
            skipped = report.skipped,
            replaced,
            "document indexed"
        );
        Ok(report)
    }

    async fn clear_source(&self, source: &str) -> RagResult<usize> {
        self.index
            .delete(MetadataFilter::Source(source.to_string()))
            .await
    }

    /// Delete every chunk of a document.
    ///
    /// # Errors
    /// Returns an error if deletion fails.
    pub async fn remove_source(&self, source: &str) -> RagResult<usize> {
        let removed = self
            .index
            .delete(MetadataFilter::Source(source.to_string()))
            .await?;
        info!(source, removed, "source removed");
        Ok(removed)
    }

    /// Delete every chunk tagged with a workspace.
    ///
    /// # Errors
    /// Returns an error if deletion fails.
    pub async fn remove_workspace(&self, workspace: &str) -> RagResult<usize> {
        let removed = self
            .index
            .delete(MetadataFilter::Workspace(workspace.to_string()))
            .await?;
        info!(workspace, removed, "workspace removed");
        Ok(removed)
    }

    /// Re-tag a document by indexing it again under another workspace.
    ///
    /// # Errors
    /// Returns an error if deletion or re-indexing fails.
    pub async fn move_source(
        &self,
        source: &str,
        new_workspace: Option<&str>,
        chunks: Vec<SourceChunk>,
        summary: Option<String>,
    ) -> RagResult<IngestReport> {
        self.ingest_document(source, new_workspace, chunks, summary)
            .await
    }
}
