//! Embeddings index boundary and its implementations.

pub mod embeddings_index;
pub mod inventory;
pub mod memory_index;
pub mod sqlite_index;
pub mod sqlite_vec_loader;

pub use embeddings_index::{
    EmbeddingsIndex, IndexedChunk, MetadataFilter, StoreFuture, workspace_filter,
};
pub use inventory::{SourceSummary, summarize_sources};
pub use memory_index::{InMemoryEmbeddingsIndex, cosine_similarity};
pub use sqlite_index::SqliteEmbeddingsIndex;
pub use sqlite_vec_loader::init_sqlite_vec_extension;
