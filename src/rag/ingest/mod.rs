//! Ingestion of pre-chunked documents.

pub mod indexer;

pub use indexer::{ChunkIndexer, IngestReport, SourceChunk};
