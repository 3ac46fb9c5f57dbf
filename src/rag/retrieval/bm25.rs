//! Okapi BM25 over one corpus snapshot.
//!
//! The index is built from scratch for every retrieval call; there is no
//! incremental update. IDF follows the Okapi variant where terms present in
//! more than half of the corpus would get a negative IDF: those are floored to
//! `epsilon * average_idf` instead.

use std::collections::HashMap;

use crate::rag::core::config::Bm25Config;

/// Term statistics over a tokenized corpus.
#[derive(Clone, Debug)]
pub struct Bm25Index {
    params: Bm25Config,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<f64>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    /// Build term statistics over exactly the given documents.
    ///
    /// Returns `None` for an empty corpus: there is nothing to score against.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(corpus: &[Vec<String>], params: Bm25Config) -> Option<Self> {
        if corpus.is_empty() {
            return None;
        }

        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_counts: HashMap<String, usize> = HashMap::new();
        // First-seen order; the IDF average is summed in this order so the
        // floor is bit-identical across builds.
        let mut vocabulary: Vec<String> = Vec::new();
        let mut total_len = 0usize;

        for doc in corpus {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in doc {
                let tf = freqs.entry(token.clone()).or_insert(0);
                if *tf == 0 {
                    let df = doc_counts.entry(token.clone()).or_insert(0);
                    if *df == 0 {
                        vocabulary.push(token.clone());
                    }
                    *df += 1;
                }
                *tf += 1;
            }
            total_len += doc.len();
            doc_lens.push(doc.len() as f64);
            term_freqs.push(freqs);
        }

        let n_docs = corpus.len() as f64;
        let avg_doc_len = total_len as f64 / n_docs;

        let mut idf = HashMap::with_capacity(vocabulary.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for term in vocabulary {
            let df = doc_counts.get(&term).copied().unwrap_or(0) as f64;
            let value = (n_docs - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }

        let average_idf = if idf.is_empty() {
            0.0
        } else {
            idf_sum / idf.len() as f64
        };
        let floor = params.epsilon * average_idf;
        for term in negative {
            idf.insert(term, floor);
        }

        Some(Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        })
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    /// Whether the index holds no documents. Always false for a built index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// IDF of a term, `0.0` when the term is unknown.
    #[must_use]
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// Score every document against a tokenized query, in corpus order.
    ///
    /// Repeated query tokens contribute once per occurrence.
    #[must_use]
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let Bm25Config { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.term_freqs.len()];

        for term in query {
            let idf = self.idf(term);
            for (doc, score) in scores.iter_mut().enumerate() {
                let tf = self.term_freqs[doc].get(term).copied().unwrap_or(0);
                if tf == 0 {
                    continue;
                }
                let tf = f64::from(tf);
                let length_ratio = if self.avg_doc_len > 0.0 {
                    self.doc_lens[doc] / self.avg_doc_len
                } else {
                    1.0
                };
                let norm = k1 * b.mul_add(length_ratio, 1.0 - b);
                *score += idf * (tf * (k1 + 1.0)) / (tf + norm);
            }
        }

        scores
    }

    /// Indices of the `n` best documents with a strictly positive score.
    #[must_use]
    pub fn top_n(&self, query: &[String], n: usize) -> Vec<(usize, f64)> {
        select_top_positive(&self.scores(query), n)
    }
}

/// Pick the `n` highest scores, dropping non-positive ones.
///
/// Equal scores keep corpus order. May return fewer than `n` entries.
#[must_use]
pub fn select_top_positive(scores: &[f64], n: usize) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| *score > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::retrieval::tokenizer::Tokenizer;

    fn tokenized(docs: &[&str]) -> Vec<Vec<String>> {
        let tokenizer = Tokenizer::new().unwrap();
        docs.iter().map(|d| tokenizer.tokenize(d)).collect()
    }

    fn query(text: &str) -> Vec<String> {
        Tokenizer::new().unwrap().tokenize(text)
    }

    #[test]
    fn test_empty_corpus_builds_nothing() {
        assert!(Bm25Index::build(&[], Bm25Config::default()).is_none());
    }

    #[test]
    fn test_shared_terms_rank_above_unrelated() {
        let corpus = tokenized(&[
            "Les congés payés sont calculés sur 12 mois",
            "Le télétravail est autorisé deux jours par semaine",
            "Les congés payés s'accumulent dès l'embauche",
        ]);
        let index = Bm25Index::build(&corpus, Bm25Config::default()).unwrap();
        let scores = index.scores(&query("congés payés"));

        assert!(scores[0] > 0.0);
        assert!(scores[2] > 0.0);
        assert!(scores[1].abs() < f64::EPSILON);

        let top: Vec<usize> = index
            .top_n(&query("congés payés"), 8)
            .iter()
            .map(|(i, _)| *i)
            .collect();
        assert_eq!(top.len(), 2);
        assert!(top.contains(&0) && top.contains(&2));
        assert!(!top.contains(&1));
    }

    #[test]
    fn test_common_terms_get_epsilon_floor() {
        let corpus = tokenized(&["chat noir", "chat blanc", "chien gris"]);
        let index = Bm25Index::build(&corpus, Bm25Config::default()).unwrap();

        let raw = (3.0_f64 - 2.0 + 0.5).ln() - (2.0_f64 + 0.5).ln();
        assert!(raw < 0.0);
        assert!(index.idf("chat") > 0.0);
        assert!(index.idf("chat") < index.idf("noir"));
    }

    #[test]
    fn test_rebuilding_gives_bit_identical_scores() {
        let docs: Vec<String> = (0..40)
            .map(|i| {
                format!(
                    "contrat salarié {} prime{} congé{} mutuelle rh{} formation",
                    i % 3,
                    i % 7,
                    i % 5,
                    i % 11
                )
            })
            .collect();
        let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
        let corpus = tokenized(&refs);
        let q = query("contrat mutuelle prime3 congé2 formation");

        let reference: Vec<u64> = Bm25Index::build(&corpus, Bm25Config::default())
            .unwrap()
            .scores(&q)
            .iter()
            .map(|s| s.to_bits())
            .collect();
        for _ in 0..50 {
            let bits: Vec<u64> = Bm25Index::build(&corpus, Bm25Config::default())
                .unwrap()
                .scores(&q)
                .iter()
                .map(|s| s.to_bits())
                .collect();
            assert_eq!(bits, reference);
        }
    }

    #[test]
    fn test_only_documents_containing_term_score() {
        let corpus = tokenized(&[
            "contrat contrat avenant",
            "contrat de travail",
            "contrat mutuelle",
            "mutuelle santé",
            "prime annuelle",
        ]);
        let index = Bm25Index::build(&corpus, Bm25Config::default()).unwrap();
        let scores = index.scores(&query("avenant"));
        assert!(scores[0] > 0.0);
        assert!(scores.iter().skip(1).all(|s| s.abs() < f64::EPSILON));
    }

    #[test]
    fn test_shorter_document_wins_on_equal_tf() {
        let corpus = tokenized(&[
            "mutuelle obligatoire pour tous les salariés de l entreprise",
            "mutuelle obligatoire",
            "prime",
            "formation",
            "congé parental",
        ]);
        let index = Bm25Index::build(&corpus, Bm25Config::default()).unwrap();
        let scores = index.scores(&query("obligatoire"));
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn test_unknown_query_terms_score_zero() {
        let corpus = tokenized(&["alpha beta", "gamma"]);
        let index = Bm25Index::build(&corpus, Bm25Config::default()).unwrap();
        assert!(index.top_n(&query("delta"), 4).is_empty());
        assert!(index.top_n(&[], 4).is_empty());
    }

    #[test]
    fn test_selection_is_stable_and_bounded() {
        let scores = [0.5, 2.0, 0.5, -1.0, 0.0, 2.0, 0.5];
        let top = select_top_positive(&scores, 4);
        let indices: Vec<usize> = top.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 5, 0, 2]);

        let all = select_top_positive(&scores, 10);
        assert_eq!(all.len(), 5);
    }
}
