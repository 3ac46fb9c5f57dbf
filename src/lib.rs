//! Hybrid BM25 + vector retrieval with cross-encoder reranking, in a strictly linted crate.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit (sauf le chargeur sqlite-vec)
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))] // Interdit unwrap()
#![cfg_attr(not(test), deny(clippy::expect_used))] // Interdit expect()
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)] // Interdit println!() dans la bibliothèque
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]

// Lints pour sécurité et robustesse
#![deny(overflowing_literals)]

/// Retrieval core: indexing, hybrid candidate generation and reranking.
pub mod rag;
