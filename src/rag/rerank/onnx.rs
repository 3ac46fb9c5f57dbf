//! In-process cross-encoder via fastembed's ONNX runtime.

use std::sync::{Arc, Mutex};

use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use tracing::debug;

use crate::rag::core::errors::{RagError, RagResult};
use crate::rag::rerank::reranker::{RerankFuture, Reranker, align_scores};

/// Local cross-encoder. Inference runs on the blocking thread pool.
#[derive(Clone)]
pub struct FastembedReranker {
    model: Arc<Mutex<TextRerank>>,
}

impl FastembedReranker {
    /// Load (downloading on first use) the given reranker model.
    ///
    /// # Errors
    /// Returns an error if the model cannot be initialised.
    pub fn new(model: RerankerModel) -> RagResult<Self> {
        let model = TextRerank::try_new(RerankInitOptions::new(model))
            .map_err(|e| RagError::Rerank(format!("failed to load cross-encoder: {e}")))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    /// Load the multilingual BGE reranker.
    ///
    /// # Errors
    /// Returns an error if the model cannot be initialised.
    pub fn multilingual() -> RagResult<Self> {
        Self::new(RerankerModel::BGERerankerV2M3)
    }
}

impl Reranker for FastembedReranker {
    fn score_batch<'a>(
        &'a self,
        query: &'a str,
        passages: &'a [String],
    ) -> RerankFuture<'a, RagResult<Vec<f64>>> {
        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let passages = passages.to_vec();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || score_blocking(&model, &query, &passages))
                .await
                .map_err(|e| RagError::Rerank(format!("cross-encoder task failed: {e}")))?
        })
    }
}

fn score_blocking(
    model: &Mutex<TextRerank>,
    query: &str,
    passages: &[String],
) -> RagResult<Vec<f64>> {
    let documents: Vec<&str> = passages.iter().map(String::as_str).collect();
    let results = {
        let mut model = model
            .lock()
            .map_err(|_| RagError::Rerank("cross-encoder lock poisoned".to_string()))?;
        model
            .rerank(query, documents, false, None)
            .map_err(|e| RagError::Rerank(e.to_string()))?
    };

    debug!(documents = passages.len(), "local cross-encoder scored batch");
    align_scores(
        results
            .into_iter()
            .map(|result| (result.index, f64::from(result.score))),
        passages.len(),
    )
}
