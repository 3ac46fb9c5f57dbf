//! In-process embeddings index using brute-force cosine similarity.

use tokio::sync::RwLock;

use crate::rag::core::candidate::Passage;
use crate::rag::core::errors::RagResult;
use crate::rag::storage::embeddings_index::{
    EmbeddingsIndex, IndexedChunk, MetadataFilter, StoreFuture, workspace_filter,
};

/// Embeddings index held entirely in memory.
///
/// Suitable for tests and small corpora; insertion order is the snapshot order.
#[derive(Default)]
pub struct InMemoryEmbeddingsIndex {
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryEmbeddingsIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    /// Whether the index holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }
}

/// Cosine similarity, `0.0` when either vector has no magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn to_passage(chunk: &IndexedChunk) -> RagResult<Passage> {
    Ok(Passage::new(
        chunk.document.clone(),
        chunk.metadata.to_metadata()?,
    ))
}

impl EmbeddingsIndex for InMemoryEmbeddingsIndex {
    fn upsert(&self, chunks: Vec<IndexedChunk>) -> StoreFuture<'_, RagResult<()>> {
        Box::pin(async move {
            let mut stored = self.chunks.write().await;
            for chunk in chunks {
                match stored.iter_mut().find(|existing| existing.id == chunk.id) {
                    Some(existing) => *existing = chunk,
                    None => stored.push(chunk),
                }
            }
            Ok(())
        })
    }

    fn query<'a>(
        &'a self,
        embedding: &'a [f64],
        n_results: usize,
        workspace: Option<&'a str>,
    ) -> StoreFuture<'a, RagResult<Vec<Passage>>> {
        Box::pin(async move {
            let filter = workspace_filter(workspace).map(|ws| MetadataFilter::Workspace(ws.to_string()));
            let stored = self.chunks.read().await;

            let mut scored: Vec<(f64, &IndexedChunk)> = stored
                .iter()
                .filter(|chunk| filter.as_ref().is_none_or(|f| f.matches(&chunk.metadata)))
                .map(|chunk| (cosine_similarity(embedding, &chunk.embedding), chunk))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));

            scored
                .into_iter()
                .take(n_results)
                .map(|(_, chunk)| to_passage(chunk))
                .collect()
        })
    }

    fn get_all(&self) -> StoreFuture<'_, RagResult<Vec<Passage>>> {
        Box::pin(async move { self.chunks.read().await.iter().map(to_passage).collect() })
    }

    fn delete(&self, filter: MetadataFilter) -> StoreFuture<'_, RagResult<usize>> {
        Box::pin(async move {
            let mut stored = self.chunks.write().await;
            let before = stored.len();
            stored.retain(|chunk| !filter.matches(&chunk.metadata));
            Ok(before - stored.len())
        })
    }
}
