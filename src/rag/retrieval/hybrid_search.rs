//! Union of the vector and lexical candidate lists.
//!
//! Vector candidates come first, then lexical ones. Duplicates are detected by
//! passage text alone and the first occurrence wins, so on a collision the
//! vector path's metadata is kept. The pool is then cut to a straight prefix
//! of `pool_cap`; no score is consulted here.

use std::collections::HashSet;

use crate::rag::core::candidate::Candidate;

/// Merge both paths into a deduplicated pool of at most `pool_cap` candidates.
#[must_use]
pub fn merge_candidates(
    vector: Vec<Candidate>,
    lexical: Vec<Candidate>,
    pool_cap: usize,
) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(vector.len() + lexical.len());
    let mut pool = Vec::with_capacity(pool_cap.min(vector.len() + lexical.len()));

    for candidate in vector.into_iter().chain(lexical) {
        if pool.len() == pool_cap {
            break;
        }
        if seen.insert(candidate.text().to_string()) {
            pool.push(candidate);
        }
    }

    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::core::candidate::Passage;
    use crate::rag::core::errors::RetrievalPath;
    use crate::rag::core::metadata::ChunkMetadata;

    fn vector(text: &str, source: &str) -> Candidate {
        Candidate::from_path(
            Passage::new(text, ChunkMetadata::new(source)),
            RetrievalPath::Vector,
        )
    }

    fn lexical(text: &str, source: &str) -> Candidate {
        Candidate::from_path(
            Passage::new(text, ChunkMetadata::new(source)),
            RetrievalPath::Lexical,
        )
    }

    #[test]
    fn test_duplicate_text_keeps_vector_metadata() {
        let pool = merge_candidates(
            vec![vector("D1", "vector.pdf"), vector("D3", "v3.pdf")],
            vec![lexical("D1", "lexical.pdf"), lexical("D2", "l2.pdf")],
            50,
        );

        let texts: Vec<&str> = pool.iter().map(Candidate::text).collect();
        assert_eq!(texts, vec!["D1", "D3", "D2"]);
        assert_eq!(pool[0].metadata().source, "vector.pdf");
        assert_eq!(pool[0].origin, Some(RetrievalPath::Vector));
    }

    #[test]
    fn test_duplicates_within_one_path_collapse() {
        let pool = merge_candidates(
            vec![vector("same", "a"), vector("same", "b")],
            Vec::new(),
            50,
        );
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].metadata().source, "a");
    }

    #[test]
    fn test_cap_is_prefix_truncation() {
        let vector_hits: Vec<Candidate> = (0..50).map(|i| vector(&format!("v{i}"), "v")).collect();
        let pool = merge_candidates(vector_hits, vec![lexical("very relevant", "l")], 50);
        assert_eq!(pool.len(), 50);
        assert!(pool.iter().all(|c| c.origin == Some(RetrievalPath::Vector)));
    }

    #[test]
    fn test_cap_counts_unique_candidates() {
        let pool = merge_candidates(
            vec![vector("a", "1"), vector("a", "2"), vector("b", "3")],
            vec![lexical("c", "4")],
            2,
        );
        let texts: Vec<&str> = pool.iter().map(Candidate::text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_inputs_give_empty_pool() {
        assert!(merge_candidates(Vec::new(), Vec::new(), 50).is_empty());
    }
}
