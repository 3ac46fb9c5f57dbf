//! Core retrieval types: configuration, errors, metadata and candidates.

pub mod candidate;
pub mod config;
pub mod errors;
pub mod metadata;

pub use candidate::{Candidate, ChunkId, Passage, ScoredCandidate};
pub use config::{
    Bm25Config, EmbeddingConfig, RagConfig, RerankerConfig, RetrievalConfig, StorageConfig,
};
pub use errors::{PathError, RagError, RagResult, RetrievalPath};
pub use metadata::{ChunkMetadata, MetadataValue, StoredMetadata};
