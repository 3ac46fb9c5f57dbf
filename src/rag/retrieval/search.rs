//! The two independent candidate paths.
//!
//! Each path reports its own failure as a [`PathError`]; deciding what to do
//! with a failed path is left to the orchestrator.

use tracing::debug;

use crate::rag::core::candidate::{Candidate, Passage};
use crate::rag::core::config::Bm25Config;
use crate::rag::core::errors::{PathError, RagResult, RetrievalPath};
use crate::rag::embedding::embedder::Embedder;
use crate::rag::retrieval::bm25::Bm25Index;
use crate::rag::retrieval::tokenizer::Tokenizer;
use crate::rag::storage::embeddings_index::{EmbeddingsIndex, workspace_filter};

/// Embed the query once and take the `n_results` nearest passages.
///
/// # Errors
/// Returns a vector [`PathError`] if embedding or the index query fails.
pub async fn fetch_vector_candidates(
    embedder: &dyn Embedder,
    index: &dyn EmbeddingsIndex,
    query: &str,
    n_results: usize,
    workspace: Option<&str>,
) -> Result<Vec<Candidate>, PathError> {
    let embedding = embedder
        .embed_text(query)
        .await
        .map_err(PathError::vector)?;
    let hits = index
        .query(&embedding.vec, n_results, workspace)
        .await
        .map_err(PathError::vector)?;

    debug!(hits = hits.len(), "vector path");
    Ok(hits
        .into_iter()
        .map(|passage| Candidate::from_path(passage, RetrievalPath::Vector))
        .collect())
}

/// Materialize the corpus snapshot and score it with BM25.
///
/// When `scope` is set the snapshot is narrowed to that workspace before the
/// index is built; otherwise the whole corpus is scored.
///
/// # Errors
/// Returns a lexical [`PathError`] if the snapshot cannot be read.
pub async fn fetch_lexical_candidates(
    index: &dyn EmbeddingsIndex,
    tokenizer: &Tokenizer,
    params: Bm25Config,
    query: &str,
    n_results: usize,
    scope: Option<&str>,
) -> Result<Vec<Candidate>, PathError> {
    let snapshot = fetch_snapshot(index, scope)
        .await
        .map_err(PathError::lexical)?;
    let candidates = lexical_candidates(tokenizer, params, snapshot, query, n_results);
    debug!(hits = candidates.len(), "lexical path");
    Ok(candidates)
}

async fn fetch_snapshot(index: &dyn EmbeddingsIndex, scope: Option<&str>) -> RagResult<Vec<Passage>> {
    let mut snapshot = index.get_all().await?;
    if let Some(workspace) = workspace_filter(scope) {
        snapshot.retain(|passage| passage.metadata.workspace_tag() == Some(workspace));
    }
    Ok(snapshot)
}

/// Score a snapshot against the query and keep the positive top `n_results`.
///
/// An empty snapshot contributes nothing and no index is built.
#[must_use]
pub fn lexical_candidates(
    tokenizer: &Tokenizer,
    params: Bm25Config,
    snapshot: Vec<Passage>,
    query: &str,
    n_results: usize,
) -> Vec<Candidate> {
    let corpus: Vec<Vec<String>> = snapshot
        .iter()
        .map(|passage| tokenizer.tokenize(&passage.text))
        .collect();
    let Some(index) = Bm25Index::build(&corpus, params) else {
        return Vec::new();
    };

    let query_tokens = tokenizer.tokenize(query);
    let selected = index.top_n(&query_tokens, n_results);

    let mut slots: Vec<Option<Passage>> = snapshot.into_iter().map(Some).collect();
    selected
        .into_iter()
        .filter_map(|(position, _)| slots.get_mut(position).and_then(Option::take))
        .map(|passage| Candidate::from_path(passage, RetrievalPath::Lexical))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rig::embeddings::{Embedding, EmbeddingError};

    use super::*;
    use crate::rag::core::errors::RagError;
    use crate::rag::core::metadata::ChunkMetadata;
    use crate::rag::embedding::embedder::EmbedFuture;
    use crate::rag::storage::embeddings_index::{IndexedChunk, MetadataFilter, StoreFuture};
    use crate::rag::storage::memory_index::InMemoryEmbeddingsIndex;
    use crate::rag::core::candidate::ChunkId;

    struct FixedEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Embedder for FixedEmbedder {
        fn embed_text(&self, text: &str) -> EmbedFuture<'_, RagResult<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = text.to_string();
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    return Err(RagError::Embedding(EmbeddingError::ProviderError(
                        "model offline".to_string(),
                    )));
                }
                Ok(Embedding {
                    document: text,
                    vec: vec![1.0, 0.0],
                })
            })
        }

        fn embed_texts(&self, texts: Vec<String>) -> EmbedFuture<'_, RagResult<Vec<Embedding>>> {
            Box::pin(async move {
                Ok(texts
                    .into_iter()
                    .map(|document| Embedding {
                        document,
                        vec: vec![1.0, 0.0],
                    })
                    .collect())
            })
        }

        fn ndims(&self) -> usize {
            2
        }
    }

    struct BrokenIndex;

    impl EmbeddingsIndex for BrokenIndex {
        fn upsert(&self, _chunks: Vec<IndexedChunk>) -> StoreFuture<'_, RagResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn query<'a>(
            &'a self,
            _embedding: &'a [f64],
            _n_results: usize,
            _workspace: Option<&'a str>,
        ) -> StoreFuture<'a, RagResult<Vec<Passage>>> {
            Box::pin(async { Err(RagError::EmbeddingsIndex("unreachable".to_string())) })
        }

        fn get_all(&self) -> StoreFuture<'_, RagResult<Vec<Passage>>> {
            Box::pin(async { Err(RagError::EmbeddingsIndex("unreachable".to_string())) })
        }

        fn delete(&self, _filter: MetadataFilter) -> StoreFuture<'_, RagResult<usize>> {
            Box::pin(async { Ok(0) })
        }
    }

    fn tokenizer() -> Tokenizer {
        Tokenizer::new().unwrap()
    }

    async fn seeded_index() -> InMemoryEmbeddingsIndex {
        let index = InMemoryEmbeddingsIndex::new();
        let rows = [
            ("a.pdf", "Les congés payés sont calculés sur 12 mois", "rh", vec![1.0, 0.0]),
            ("b.pdf", "Le télétravail est autorisé deux jours par semaine", "it", vec![0.0, 1.0]),
            ("c.pdf", "Les congés payés s'accumulent dès l'embauche", "it", vec![0.7, 0.7]),
            ("d.pdf", "La mutuelle est obligatoire", "it", vec![0.0, 1.0]),
            ("e.pdf", "Prime annuelle de fin d'année", "it", vec![0.0, 1.0]),
        ];
        let chunks = rows
            .into_iter()
            .map(|(source, text, ws, vec)| IndexedChunk {
                id: ChunkId::for_chunk(source, 0),
                document: text.to_string(),
                metadata: ChunkMetadata::new(source).to_stored(0, Some(ws)),
                embedding: vec,
            })
            .collect();
        index.upsert(chunks).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_vector_path_embeds_once_and_tags_origin() {
        let embedder = FixedEmbedder {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let index = seeded_index().await;
        let hits = fetch_vector_candidates(&embedder, &index, "congés", 2, None)
            .await
            .unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata().source, "a.pdf");
        assert!(hits.iter().all(|c| c.origin == Some(RetrievalPath::Vector)));
    }

    #[tokio::test]
    async fn test_vector_path_only_returns_requested_workspace() {
        let embedder = FixedEmbedder {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let index = seeded_index().await;
        let hits = fetch_vector_candidates(&embedder, &index, "congés", 8, Some("it"))
            .await
            .unwrap();

        assert_eq!(hits.len(), 4);
        assert!(
            hits.iter()
                .all(|c| c.metadata().workspace.as_deref() == Some("it"))
        );
        assert!(hits.iter().all(|c| c.metadata().source != "a.pdf"));
    }

    #[tokio::test]
    async fn test_vector_path_reports_embedding_failure() {
        let embedder = FixedEmbedder {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let index = seeded_index().await;
        let err = fetch_vector_candidates(&embedder, &index, "congés", 2, None)
            .await
            .unwrap_err();
        assert_eq!(err.path, RetrievalPath::Vector);
    }

    #[tokio::test]
    async fn test_lexical_path_ignores_workspace_without_scope() {
        let index = seeded_index().await;
        let hits = fetch_lexical_candidates(
            &index,
            &tokenizer(),
            Bm25Config::default(),
            "congés payés",
            8,
            None,
        )
        .await
        .unwrap();

        let sources: Vec<&str> = hits.iter().map(|c| c.metadata().source.as_str()).collect();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains(&"a.pdf") && sources.contains(&"c.pdf"));
        assert!(hits.iter().all(|c| c.origin == Some(RetrievalPath::Lexical)));
    }

    #[tokio::test]
    async fn test_lexical_path_scope_narrows_snapshot() {
        let index = seeded_index().await;
        let hits = fetch_lexical_candidates(
            &index,
            &tokenizer(),
            Bm25Config::default(),
            "congés payés",
            8,
            Some("it"),
        )
        .await
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata().source, "c.pdf");
    }

    #[tokio::test]
    async fn test_lexical_path_reports_snapshot_failure() {
        let err = fetch_lexical_candidates(
            &BrokenIndex,
            &tokenizer(),
            Bm25Config::default(),
            "congés",
            8,
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.path, RetrievalPath::Lexical);
    }

    #[test]
    fn test_empty_snapshot_yields_nothing() {
        let hits = lexical_candidates(&tokenizer(), Bm25Config::default(), Vec::new(), "congés", 8);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_lexical_selection_respects_n_results() {
        let snapshot = (0..12)
            .map(|i| Passage::new(format!("prime annuelle {i}"), ChunkMetadata::new(format!("{i}.txt"))))
            .chain(std::iter::once(Passage::new("formation", ChunkMetadata::new("f.txt"))))
            .collect();
        let hits = lexical_candidates(&tokenizer(), Bm25Config::default(), snapshot, "annuelle", 8);
        assert_eq!(hits.len(), 8);
        assert_eq!(hits[0].metadata().source, "0.txt");
    }
}
