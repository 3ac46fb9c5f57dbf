//! Query and chunk embeddings.
//!
//! The same embedder instance must serve ingestion and query time; vectors
//! produced by different models are not comparable. Every vector leaving an
//! embedder is checked against the announced dimensionality before it can
//! reach the index.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client as ReqwestClient;
use rig::client::{EmbeddingsClient, Nothing};
use rig::embeddings::{Embedding, EmbeddingModel};
use rig::providers::ollama;
use tracing::debug;

use crate::rag::core::config::EmbeddingConfig;
use crate::rag::core::errors::{RagError, RagResult};

/// Boxed future type for embedder operations.
pub type EmbedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text embedding model shared by ingestion and the vector path.
pub trait Embedder: Send + Sync {
    /// Embed one query string.
    ///
    /// # Errors
    /// Returns an error if the model call fails.
    fn embed_text(&self, text: &str) -> EmbedFuture<'_, RagResult<Embedding>>;
    /// Embed chunk texts, one vector per input in input order.
    ///
    /// # Errors
    /// Returns an error if the model call fails.
    fn embed_texts(&self, texts: Vec<String>) -> EmbedFuture<'_, RagResult<Vec<Embedding>>>;
    /// Vector length every embedding must have.
    fn ndims(&self) -> usize;
}

/// Check that a vector has the dimensionality the embedder announces.
///
/// # Errors
/// Returns an error on a length mismatch.
pub fn ensure_ndims(embedding: &Embedding, ndims: usize) -> RagResult<()> {
    if embedding.vec.len() == ndims {
        Ok(())
    } else {
        Err(RagError::InvalidChunk(format!(
            "embedding has {} dimensions, expected {ndims}",
            embedding.vec.len()
        )))
    }
}

/// Check a batch answer: one vector per requested text, each of `ndims` values.
///
/// # Errors
/// Returns [`RagError::InvalidChunk`] on a count or length mismatch.
pub fn ensure_batch(embeddings: &[Embedding], expected: usize, ndims: usize) -> RagResult<()> {
    if embeddings.len() != expected {
        return Err(RagError::InvalidChunk(format!(
            "embedder returned {} vectors for {expected} chunks",
            embeddings.len()
        )));
    }
    embeddings
        .iter()
        .try_for_each(|embedding| ensure_ndims(embedding, ndims))
}

/// Split texts into request-sized groups, keeping order.
fn into_batches(texts: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(texts.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(texts.len()));
    for text in texts {
        current.push(text);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

type OllamaEmbeddingModel = ollama::EmbeddingModel<ReqwestClient>;

/// Ollama embedding model reached through Rig.
#[derive(Clone)]
pub struct OllamaEmbedder {
    model: OllamaEmbeddingModel,
    model_name: String,
    ndims: usize,
    batch_size: usize,
}

impl OllamaEmbedder {
    /// Build the embedder from config.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> RagResult<Self> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(Nothing);
        let builder = match &config.base_url {
            Some(base_url) => builder.base_url(base_url),
            None => builder,
        };
        let client = builder.build().map_err(RagError::from)?;
        Ok(Self {
            model: client.embedding_model_with_ndims(config.model.clone(), config.ndims),
            model_name: config.model.clone(),
            ndims: config.ndims,
            batch_size: config.batch_size,
        })
    }

    async fn embed_query(&self, text: String) -> RagResult<Embedding> {
        let embedding = self
            .model
            .embed_text(&text)
            .await
            .map_err(RagError::Embedding)?;
        ensure_ndims(&embedding, self.ndims)?;
        Ok(embedding)
    }

    async fn embed_chunks(&self, texts: Vec<String>) -> RagResult<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in into_batches(texts, self.batch_size) {
            let requested = batch.len();
            let vectors = self
                .model
                .embed_texts(batch)
                .await
                .map_err(RagError::Embedding)?;
            ensure_batch(&vectors, requested, self.ndims)?;
            debug!(model = %self.model_name, texts = requested, "embedded batch");
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed_text(&self, text: &str) -> EmbedFuture<'_, RagResult<Embedding>> {
        Box::pin(self.embed_query(text.to_string()))
    }

    fn embed_texts(&self, texts: Vec<String>) -> EmbedFuture<'_, RagResult<Vec<Embedding>>> {
        Box::pin(self.embed_chunks(texts))
    }

    fn ndims(&self) -> usize {
        self.ndims
    }
}
