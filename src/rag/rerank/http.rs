//! Cross-encoder served over HTTP.
//!
//! Speaks the common `/rerank` shape: `{model, query, documents}` in, a
//! `results` (or `data`) array of `{index, relevance_score | score}` out.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::rag::core::config::RerankerConfig;
use crate::rag::core::errors::{RagError, RagResult};
use crate::rag::rerank::reranker::{RerankFuture, Reranker, align_scores};

/// Reranker backed by a remote cross-encoder endpoint.
#[derive(Clone, Debug)]
pub struct HttpReranker {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpReranker {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &RerankerConfig) -> RagResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let url = format!("{}{}", config.base_url.trim_end_matches('/'), config.path);
        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn request(&self, query: &str, passages: &[String]) -> RagResult<Vec<f64>> {
        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": passages,
        });
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let json: Value = request.send().await?.error_for_status()?.json().await?;
        let scores = parse_rerank_response(&json, passages.len())?;
        debug!(documents = passages.len(), "cross-encoder scored batch");
        Ok(scores)
    }
}

impl Reranker for HttpReranker {
    fn score_batch<'a>(
        &'a self,
        query: &'a str,
        passages: &'a [String],
    ) -> RerankFuture<'a, RagResult<Vec<f64>>> {
        Box::pin(self.request(query, passages))
    }
}

/// Align response entries to document positions.
///
/// Every document must receive exactly one score; repeated or extra entries
/// fail the batch.
fn parse_rerank_response(json: &Value, doc_count: usize) -> RagResult<Vec<f64>> {
    let results = json
        .get("results")
        .or_else(|| json.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| RagError::Rerank("response is missing results array".to_string()))?;

    let mut entries = Vec::with_capacity(results.len());
    for item in results {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| RagError::Rerank("result is missing index".to_string()))?;
        let score = item
            .get("relevance_score")
            .or_else(|| item.get("score"))
            .and_then(Value::as_f64)
            .ok_or_else(|| RagError::Rerank(format!("result {index} is missing score")))?;
        entries.push((index, score));
    }

    align_scores(entries, doc_count)
}
