//! Rendering retrieved passages for the answer generator.

pub mod context_builder;

pub use context_builder::{NO_DOCUMENTS_ANSWER, build_context_block, citation};
