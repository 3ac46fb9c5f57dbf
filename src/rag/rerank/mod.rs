//! Reranking of the merged pool with a cross-encoder.

pub mod http;
#[cfg(feature = "cross-encoder")]
pub mod onnx;
pub mod reranker;

pub use http::HttpReranker;
#[cfg(feature = "cross-encoder")]
pub use onnx::FastembedReranker;
pub use reranker::{RerankFuture, Reranker, align_scores, rank_by_scores, rerank};
