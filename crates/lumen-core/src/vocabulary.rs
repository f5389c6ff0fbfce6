//! Corpus-wide term statistics: document frequency and IDF weights.

use std::collections::HashMap;

use crate::chunks::Chunk;
use crate::tokenize::term_set;

/// Document frequency counts chunks, not logical documents: a term found in
/// three chunks of one file has a frequency of 3.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    pub document_frequency: HashMap<String, usize>,
    pub idf: HashMap<String, f64>,
    /// Logical documents ingested (one per index-text or index-file call).
    pub total_documents: usize,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count each distinct term of `chunk` once.
    pub fn observe(&mut self, chunk: &Chunk) {
        for term in term_set(&chunk.text) {
            *self.document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    /// Undo [`observe`](Self::observe) for a removed chunk. Terms that drop to
    /// zero leave the vocabulary.
    pub fn forget(&mut self, chunk: &Chunk) {
        for term in term_set(&chunk.text) {
            if let Some(df) = self.document_frequency.get_mut(&term) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.document_frequency.remove(&term);
                }
            }
        }
    }

    /// Recount document frequency from scratch over `chunks`.
    pub fn rebuild<'a>(&mut self, chunks: impl IntoIterator<Item = &'a Chunk>) {
        self.document_frequency.clear();
        for chunk in chunks {
            self.observe(chunk);
        }
    }

    /// `idf = ln(total_chunks / (1 + df)) + 1` for every known term.
    pub fn recompute_idf(&mut self, total_chunks: usize) {
        let n = total_chunks as f64;
        self.idf = self
            .document_frequency
            .iter()
            .map(|(term, &df)| (term.clone(), (n / (1.0 + df as f64)).ln() + 1.0))
            .collect();
    }

    /// IDF of `term`, or `ln(total_documents + 1)` when it was never seen.
    pub fn weight(&self, term: &str) -> f64 {
        self.idf
            .get(term)
            .copied()
            .unwrap_or_else(|| self.unseen_weight())
    }

    pub fn unseen_weight(&self) -> f64 {
        (self.total_documents as f64 + 1.0).ln()
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    pub fn clear(&mut self) {
        self.document_frequency.clear();
        self.idf.clear();
        self.total_documents = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{Chunker, Metadata};

    fn chunk(text: &str) -> Chunk {
        Chunker::default().chunk(text, "t", &Metadata::new()).remove(0)
    }

    #[test]
    fn observe_counts_distinct_terms_once() {
        let mut v = Vocabulary::new();
        v.observe(&chunk("apple apple apple pear"));
        v.observe(&chunk("apple plum"));
        assert_eq!(v.document_frequency["apple"], 2);
        assert_eq!(v.document_frequency["pear"], 1);
    }

    #[test]
    fn forget_reverses_observe() {
        let mut v = Vocabulary::new();
        let a = chunk("apple pear");
        let b = chunk("apple plum");
        v.observe(&a);
        v.observe(&b);
        v.forget(&a);
        assert_eq!(v.document_frequency["apple"], 1);
        assert!(!v.document_frequency.contains_key("pear"));
    }

    #[test]
    fn idf_formula() {
        let mut v = Vocabulary::new();
        v.observe(&chunk("apple pear"));
        v.observe(&chunk("apple plum"));
        v.recompute_idf(2);
        assert!((v.weight("apple") - ((2.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((v.weight("pear") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let mut v = Vocabulary::new();
        for text in ["common rare", "common thing", "common thing", "common stuff"] {
            v.observe(&chunk(text));
        }
        v.recompute_idf(4);
        assert!(v.weight("rare") > v.weight("thing"));
        assert!(v.weight("thing") > v.weight("common"));
        assert!((v.weight("rare") - v.weight("stuff")).abs() < 1e-12);
    }

    #[test]
    fn unseen_term_falls_back() {
        let mut v = Vocabulary::new();
        v.total_documents = 4;
        assert!((v.weight("zebra") - 5.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn rebuild_matches_incremental() {
        let chunks = [chunk("red green"), chunk("green blue")];
        let mut inc = Vocabulary::new();
        chunks.iter().for_each(|c| inc.observe(c));
        let mut full = Vocabulary::new();
        full.document_frequency.insert("stale".into(), 9);
        full.rebuild(chunks.iter());
        assert_eq!(inc.document_frequency, full.document_frequency);
    }
}
