//! Cross-encoder reranking of the merged candidate pool.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::rag::core::candidate::{Candidate, ScoredCandidate};
use crate::rag::core::errors::{RagError, RagResult};

/// Boxed future type for reranker operations.
pub type RerankFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Relevance model scoring `(query, passage)` pairs jointly.
pub trait Reranker: Send + Sync {
    /// Score every passage against the query, in input order.
    ///
    /// Scores are unbounded reals; only their order matters. A batch either
    /// scores completely or fails.
    ///
    /// # Errors
    /// Returns an error if the model cannot score the batch.
    fn score_batch<'a>(
        &'a self,
        query: &'a str,
        passages: &'a [String],
    ) -> RerankFuture<'a, RagResult<Vec<f64>>>;
}

/// Score the pool, sort by descending score and keep the best `top_k`.
///
/// An empty pool returns immediately without calling the model. Equal scores
/// keep pool order.
///
/// # Errors
/// Returns [`RagError::Rerank`] if scoring fails or returns an unusable batch.
pub async fn rerank(
    reranker: &dyn Reranker,
    query: &str,
    pool: Vec<Candidate>,
    top_k: usize,
) -> RagResult<Vec<ScoredCandidate>> {
    if pool.is_empty() {
        return Ok(Vec::new());
    }

    let passages: Vec<String> = pool.iter().map(|c| c.text().to_string()).collect();
    let scores = reranker.score_batch(query, &passages).await?;
    let ranked = rank_by_scores(pool, &scores, top_k)?;
    debug!(scored = passages.len(), kept = ranked.len(), "reranked pool");
    Ok(ranked)
}

/// Attach scores to candidates and sort them, stable on ties.
///
/// # Errors
/// Returns [`RagError::Rerank`] if the score count differs from the pool size
/// or a score is not finite.
pub fn rank_by_scores(
    pool: Vec<Candidate>,
    scores: &[f64],
    top_k: usize,
) -> RagResult<Vec<ScoredCandidate>> {
    if scores.len() != pool.len() {
        return Err(RagError::Rerank(format!(
            "expected {} scores, got {}",
            pool.len(),
            scores.len()
        )));
    }
    if let Some(position) = scores.iter().position(|s| !s.is_finite()) {
        return Err(RagError::Rerank(format!(
            "non-finite score for candidate {position}"
        )));
    }

    let mut scored: Vec<ScoredCandidate> = pool
        .into_iter()
        .zip(scores.iter().copied())
        .map(|(candidate, score)| ScoredCandidate { score, candidate })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    Ok(scored)
}

/// Place `(index, score)` entries returned by a model at their document positions.
///
/// Every document must be scored exactly once.
///
/// # Errors
/// Returns [`RagError::Rerank`] on a count mismatch, an out-of-range or
/// repeated index, or a document left without a score.
pub fn align_scores<I>(entries: I, doc_count: usize) -> RagResult<Vec<f64>>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    let mut scores: Vec<Option<f64>> = vec![None; doc_count];
    let mut seen = 0usize;
    for (index, score) in entries {
        seen += 1;
        let slot = scores
            .get_mut(index)
            .ok_or_else(|| RagError::Rerank(format!("result index {index} out of range")))?;
        if slot.replace(score).is_some() {
            return Err(RagError::Rerank(format!("result index {index} repeated")));
        }
    }
    if seen != doc_count {
        return Err(RagError::Rerank(format!(
            "expected {doc_count} results, got {seen}"
        )));
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, score)| {
            score.ok_or_else(|| RagError::Rerank(format!("no score for document {i}")))
        })
        .collect()
}
