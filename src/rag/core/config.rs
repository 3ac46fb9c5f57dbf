//! Configuration for the retrieval subsystem.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::rag::core::errors::{RagError, RagResult};

/// Top-level configuration for retrieval and ingestion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embeddings index storage settings.
    pub storage: StorageConfig,
    /// Embedding model settings.
    pub embedding: EmbeddingConfig,
    /// Reranker endpoint settings.
    pub reranker: RerankerConfig,
    /// Retrieval pipeline settings.
    pub retrieval: RetrievalConfig,
    /// BM25 parameters.
    pub lexical: Bm25Config,
}

impl RagConfig {
    /// Build a config from defaults overlaid with `RAG_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> RagResult<Self> {
        let mut config = Self::default();

        if let Some(path) = env_var("RAG_SQLITE_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(table) = env_var("RAG_TABLE") {
            config.storage.table = table;
        }
        if let Some(url) = env_var("RAG_OLLAMA_URL") {
            config.embedding.base_url = Some(url);
        }
        if let Some(model) = env_var("RAG_EMBED_MODEL") {
            config.embedding.model = model;
        }
        if let Some(ndims) = parse_env_var("RAG_EMBED_NDIMS")? {
            config.embedding.ndims = ndims;
        }
        if let Some(batch_size) = parse_env_var("RAG_EMBED_BATCH")? {
            config.embedding.batch_size = batch_size;
        }
        if let Some(url) = env_var("RAG_RERANK_URL") {
            config.reranker.base_url = url;
        }
        if let Some(model) = env_var("RAG_RERANK_MODEL") {
            config.reranker.model = model;
        }
        if let Some(key) = env_var("RAG_RERANK_API_KEY") {
            config.reranker.api_key = Some(key);
        }
        if let Some(n_results) = parse_env_var("RAG_N_RESULTS")? {
            config.retrieval.n_results = n_results;
        }
        if let Some(final_top_k) = parse_env_var("RAG_FINAL_TOP_K")? {
            config.retrieval.final_top_k = final_top_k;
        }

        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> RagResult<()> {
        self.storage.validate()?;
        self.retrieval.validate()?;
        self.lexical.validate()?;

        if self.embedding.ndims == 0 {
            return Err(RagError::InvalidConfig(
                "embedding.ndims must be > 0".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(RagError::InvalidConfig(
                "embedding.batch_size must be > 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.embedding.base_url {
            Url::parse(base_url)?;
        }

        Url::parse(&self.reranker.base_url)?;
        if self.reranker.timeout_ms == 0 {
            return Err(RagError::InvalidConfig(
                "reranker.timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_var<T: FromStr>(name: &str) -> RagResult<Option<T>> {
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| RagError::InvalidConfig(format!("{name} is not a valid number")))
        })
        .transpose()
}

/// Storage configuration for the embeddings index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Chunk table name.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("rag.sqlite"),
            table: "rag_chunks".to_string(),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> RagResult<()> {
        validate_table_name(&self.table)
    }
}

/// Check that a table name can be spliced into SQL as a bare identifier.
///
/// # Errors
/// Returns [`RagError::InvalidConfig`] unless the name is ASCII alphanumerics
/// and underscores, not starting with a digit.
pub fn validate_table_name(table: &str) -> RagResult<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(RagError::InvalidConfig(format!(
            "storage.table `{table}` must be a plain SQL identifier"
        )));
    }
    Ok(())
}

/// Embedding model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Ollama embedding model name.
    pub model: String,
    /// Embedding vector dimensions.
    pub ndims: usize,
    /// Optional custom base URL.
    pub base_url: Option<String>,
    /// Texts sent per embedding request at ingestion.
    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,
}

const fn default_embed_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            ndims: 768,
            base_url: None,
            batch_size: default_embed_batch_size(),
        }
    }
}

/// Cross-encoder endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Service base URL.
    pub base_url: String,
    /// Rerank route appended to the base URL.
    pub path: String,
    /// Model name sent with each request.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            path: "/rerank".to_string(),
            model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

/// Retrieval pipeline settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates contributed by each path before merging.
    pub n_results: usize,
    /// Maximum merged pool handed to the reranker.
    pub pool_cap: usize,
    /// Final number of passages returned after reranking.
    pub final_top_k: usize,
    /// Restrict lexical candidates to the requested workspace.
    ///
    /// Off by default: BM25 scores the whole corpus snapshot and only the
    /// vector path honours the workspace filter.
    pub scope_lexical_to_workspace: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_results: 8,
            pool_cap: 50,
            final_top_k: 4,
            scope_lexical_to_workspace: false,
        }
    }
}

impl RetrievalConfig {
    fn validate(&self) -> RagResult<()> {
        if self.n_results == 0 {
            return Err(RagError::InvalidConfig(
                "retrieval.n_results must be > 0".to_string(),
            ));
        }
        if self.pool_cap == 0 {
            return Err(RagError::InvalidConfig(
                "retrieval.pool_cap must be > 0".to_string(),
            ));
        }
        if self.final_top_k == 0 {
            return Err(RagError::InvalidConfig(
                "retrieval.final_top_k must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Okapi BM25 parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term frequency saturation.
    pub k1: f64,
    /// Document length normalization in `[0, 1]`.
    pub b: f64,
    /// Floor for negative IDF values, as a fraction of the average IDF.
    pub epsilon: f64,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

impl Bm25Config {
    fn validate(&self) -> RagResult<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(RagError::InvalidConfig(
                "lexical.k1 must be a finite value >= 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(RagError::InvalidConfig(
                "lexical.b must be within [0, 1]".to_string(),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(RagError::InvalidConfig(
                "lexical.epsilon must be a finite value >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.n_results, 8);
        assert_eq!(config.retrieval.pool_cap, 50);
        assert_eq!(config.retrieval.final_top_k, 4);
        assert!(!config.retrieval.scope_lexical_to_workspace);
        assert!((config.lexical.k1 - 1.5).abs() < f64::EPSILON);
        assert!((config.lexical.b - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_zero_pool_cap() {
        let mut config = RagConfig::default();
        config.retrieval.pool_cap = 0;
        assert!(matches!(config.validate(), Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_embed_batch() {
        let mut config = RagConfig::default();
        config.embedding.batch_size = 0;
        assert!(matches!(config.validate(), Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_out_of_range_b() {
        let mut config = RagConfig::default();
        config.lexical.b = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_table_name_with_sql() {
        let mut config = RagConfig::default();
        config.storage.table = "chunks; DROP TABLE x".to_string();
        assert!(config.validate().is_err());
        config.storage.table = "1chunks".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_reranker_url() {
        let mut config = RagConfig::default();
        config.reranker.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(RagError::Url(_))));
    }

    #[test]
    fn test_serde_round_trip_keeps_sections() {
        let config = RagConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RagConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.storage.table, "rag_chunks");
        assert_eq!(parsed.embedding.ndims, 768);
    }
}
