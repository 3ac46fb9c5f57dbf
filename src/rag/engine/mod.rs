//! Retrieval orchestration.

pub mod core;

pub use self::core::{HybridRetriever, RetrievalBackends, RetrievalReport};
