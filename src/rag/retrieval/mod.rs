//! Candidate generation: tokenizer, BM25, the two retrieval paths and the merger.

pub mod bm25;
pub mod hybrid_search;
pub mod search;
pub mod tokenizer;

pub use bm25::{Bm25Index, select_top_positive};
pub use hybrid_search::merge_candidates;
pub use search::{fetch_lexical_candidates, fetch_vector_candidates, lexical_candidates};
pub use tokenizer::Tokenizer;
