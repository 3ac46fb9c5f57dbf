//! Embedding model modules.

pub mod embedder;

pub use embedder::{EmbedFuture, Embedder, OllamaEmbedder, ensure_batch, ensure_ndims};
