//! Hybrid retrieval orchestration.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::rag::core::candidate::{Candidate, Passage, ScoredCandidate};
use crate::rag::core::config::RagConfig;
use crate::rag::core::errors::{PathError, RagError, RagResult, RetrievalPath};
use crate::rag::embedding::embedder::{Embedder, OllamaEmbedder};
use crate::rag::rerank::http::HttpReranker;
use crate::rag::rerank::reranker::{Reranker, rerank};
use crate::rag::retrieval::hybrid_search::merge_candidates;
use crate::rag::retrieval::search::{fetch_lexical_candidates, fetch_vector_candidates};
use crate::rag::retrieval::tokenizer::Tokenizer;
use crate::rag::storage::embeddings_index::{EmbeddingsIndex, workspace_filter};
use crate::rag::storage::sqlite_index::SqliteEmbeddingsIndex;

/// Backend dependencies for the retriever.
///
/// Built once at startup and shared read-only by every retrieval call.
#[derive(Clone)]
pub struct RetrievalBackends {
    /// Embeddings index holding the corpus.
    pub index: Arc<dyn EmbeddingsIndex>,
    /// Embedding model, the same one used at ingestion.
    pub embedder: Arc<dyn Embedder>,
    /// Cross-encoder reranker.
    pub reranker: Arc<dyn Reranker>,
}

impl RetrievalBackends {
    /// Build the default `SQLite` + Ollama + HTTP cross-encoder backends.
    ///
    /// The configuration is validated before any backend is touched.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or any backend cannot
    /// be initialized.
    pub async fn from_config(config: &RagConfig) -> RagResult<Self> {
        config.validate()?;
        let index = Arc::new(SqliteEmbeddingsIndex::open(&config.storage).await?);
        let embedder = Arc::new(OllamaEmbedder::new(&config.embedding)?);
        let reranker = Arc::new(HttpReranker::new(&config.reranker)?);

        Ok(Self {
            index,
            embedder,
            reranker,
        })
    }
}

/// Outcome of one retrieval call with per-step counts.
#[derive(Clone, Debug, Serialize)]
pub struct RetrievalReport {
    /// Ranked passages, best first.
    pub passages: Vec<ScoredCandidate>,
    /// Candidates contributed by the vector path.
    pub vector_hits: usize,
    /// Candidates contributed by the lexical path.
    pub lexical_hits: usize,
    /// Deduplicated pool size handed to the reranker.
    pub pool_size: usize,
    /// Paths that failed and contributed nothing.
    pub degraded: Vec<RetrievalPath>,
}

/// Vector + BM25 retriever with cross-encoder reranking.
pub struct HybridRetriever {
    config: RagConfig,
    index: Arc<dyn EmbeddingsIndex>,
    embedder: Arc<dyn Embedder>,
    reranker: Arc<dyn Reranker>,
    tokenizer: Tokenizer,
}

impl HybridRetriever {
    /// Create a retriever over the given backends.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RagConfig, backends: RetrievalBackends) -> RagResult<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new()?;

        Ok(Self {
            config,
            index: backends.index,
            embedder: backends.embedder,
            reranker: backends.reranker,
            tokenizer,
        })
    }

    /// Create a retriever using the default backends.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or backends cannot be
    /// initialized.
    pub async fn from_config(config: RagConfig) -> RagResult<Self> {
        config.validate()?;
        let backends = RetrievalBackends::from_config(&config).await?;
        Self::new(config, backends)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Embeddings index shared with ingestion.
    #[must_use]
    pub fn index(&self) -> Arc<dyn EmbeddingsIndex> {
        Arc::clone(&self.index)
    }

    /// Embedder shared with ingestion.
    #[must_use]
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Retrieve at most `final_top_k` passages for a query.
    ///
    /// `n_results` bounds what each path contributes before merging and
    /// defaults to the configured value. An empty list means nothing matched.
    ///
    /// # Errors
    /// Returns [`RagError::Rerank`] if the reranker fails. Failures of a single
    /// retrieval path never surface here.
    pub async fn retrieve(
        &self,
        query: &str,
        n_results: Option<usize>,
        workspace: Option<&str>,
    ) -> RagResult<Vec<Passage>> {
        let report = self.retrieve_with_report(query, n_results, workspace).await?;
        Ok(report
            .passages
            .into_iter()
            .map(|scored| scored.candidate.passage)
            .collect())
    }

    /// Same as [`Self::retrieve`] but keeps scores and per-step counts.
    ///
    /// # Errors
    /// Returns [`RagError::Rerank`] if the reranker fails.
    pub async fn retrieve_with_report(
        &self,
        query: &str,
        n_results: Option<usize>,
        workspace: Option<&str>,
    ) -> RagResult<RetrievalReport> {
        let retrieval = &self.config.retrieval;
        let n_results = n_results.unwrap_or(retrieval.n_results);
        let workspace = workspace_filter(workspace);
        let lexical_scope = if retrieval.scope_lexical_to_workspace {
            workspace
        } else {
            None
        };

        let (vector, lexical) = tokio::join!(
            fetch_vector_candidates(
                self.embedder.as_ref(),
                self.index.as_ref(),
                query,
                n_results,
                workspace,
            ),
            fetch_lexical_candidates(
                self.index.as_ref(),
                &self.tokenizer,
                self.config.lexical,
                query,
                n_results,
                lexical_scope,
            ),
        );

        let mut degraded = Vec::new();
        let vector = recover_path(vector, &mut degraded);
        let lexical = recover_path(lexical, &mut degraded);
        let vector_hits = vector.len();
        let lexical_hits = lexical.len();

        let pool = merge_candidates(vector, lexical, retrieval.pool_cap);
        let pool_size = pool.len();
        debug!(vector_hits, lexical_hits, pool_size, "merged candidate pool");

        let passages = rerank(self.reranker.as_ref(), query, pool, retrieval.final_top_k)
            .await
            .map_err(|err| match err {
                RagError::Rerank(_) => err,
                other => RagError::Rerank(other.to_string()),
            })?;

        info!(
            returned = passages.len(),
            pool_size,
            workspace = workspace.unwrap_or(""),
            "retrieval completed"
        );

        Ok(RetrievalReport {
            passages,
            vector_hits,
            lexical_hits,
            pool_size,
            degraded,
        })
    }
}

fn recover_path(
    result: Result<Vec<Candidate>, PathError>,
    degraded: &mut Vec<RetrievalPath>,
) -> Vec<Candidate> {
    match result {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(path = %err.path, error = %err.source, "retrieval path degraded to empty");
            degraded.push(err.path);
            Vec::new()
        }
    }
}
