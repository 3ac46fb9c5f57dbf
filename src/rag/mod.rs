//! Hybrid retrieval for document question answering.
//!
//! Modules are organized as:
//! - `core`: Configuration, errors, metadata and candidate types
//! - `embedding`: Embedding model abstraction and Ollama implementation
//! - `storage`: Embeddings index boundary with `SQLite` and in-memory backends
//! - `retrieval`: Tokenizer, BM25, the vector and lexical paths, and the merger
//! - `rerank`: Cross-encoder reranking
//! - `engine`: Orchestration of one retrieval call
//! - `ingest`: Indexing of pre-chunked documents
//! - `prompt`: Context block for the answer generator
//! - `adapters`: Host integration helpers

pub mod adapters;
pub mod core;
pub mod embedding;
pub mod engine;
pub mod ingest;
pub mod prompt;
pub mod rerank;
pub mod retrieval;
pub mod storage;

// Re-export commonly used types for convenience
pub use adapters::init_tracing;
pub use self::core::{
    Bm25Config, Candidate, ChunkId, ChunkMetadata, EmbeddingConfig, MetadataValue, Passage,
    PathError, RagConfig, RagError, RagResult, RerankerConfig, RetrievalConfig, RetrievalPath,
    ScoredCandidate, StorageConfig, StoredMetadata,
};
pub use embedding::{EmbedFuture, Embedder, OllamaEmbedder};
pub use engine::{HybridRetriever, RetrievalBackends, RetrievalReport};
pub use ingest::{ChunkIndexer, IngestReport, SourceChunk};
pub use prompt::{NO_DOCUMENTS_ANSWER, build_context_block};
#[cfg(feature = "cross-encoder")]
pub use rerank::FastembedReranker;
pub use rerank::{HttpReranker, RerankFuture, Reranker};
pub use retrieval::{
    Bm25Index, Tokenizer, fetch_lexical_candidates, fetch_vector_candidates, merge_candidates,
};
pub use storage::{
    EmbeddingsIndex, InMemoryEmbeddingsIndex, MetadataFilter, SourceSummary,
    SqliteEmbeddingsIndex, StoreFuture, summarize_sources,
};
