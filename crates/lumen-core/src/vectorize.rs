//! Sparse TF-IDF vectors and cosine similarity.

use std::collections::HashMap;

use crate::tokenize::tokenize;
use crate::vocabulary::Vocabulary;

/// Term → weight. Terms absent from the text are omitted.
pub type SparseVector = HashMap<String, f64>;

/// Vectorize `text` against the current vocabulary.
///
/// Term frequency is normalized as `0.5 + 0.5 * count / max_count`, so a long
/// chunk repeating a word cannot dominate by repetition alone.
pub fn vectorize(text: &str, vocabulary: &Vocabulary) -> SparseVector {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for term in tokenize(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    let Some(&max_tf) = counts.values().max() else {
        return SparseVector::new();
    };

    counts
        .into_iter()
        .map(|(term, count)| {
            let tf = 0.5 + 0.5 * (count as f64 / max_tf as f64);
            let w = tf * vocabulary.weight(&term);
            (term, w)
        })
        .collect()
}

pub fn l2_norm(v: &SparseVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Dot product over shared terms divided by both norms. Zero when either
/// vector is empty or has zero norm.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    // iterate the smaller map
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|o| w * o))
        .sum();
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab_with(terms: &[(&str, f64)], docs: usize) -> Vocabulary {
        let mut v = Vocabulary::new();
        v.total_documents = docs;
        v.idf = terms.iter().map(|(t, w)| (t.to_string(), *w)).collect();
        v
    }

    #[test]
    fn normalized_term_frequency() {
        let v = vocab_with(&[("cat", 2.0), ("dog", 1.0)], 1);
        let vec = vectorize("cat cat dog", &v);
        assert!((vec["cat"] - 2.0).abs() < 1e-12);
        assert!((vec["dog"] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn unseen_terms_use_fallback() {
        let v = vocab_with(&[], 2);
        let vec = vectorize("zebra", &v);
        assert!((vec["zebra"] - 3.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn stopword_only_text_is_empty() {
        let v = vocab_with(&[], 1);
        assert!(vectorize("the and of", &v).is_empty());
    }

    #[test]
    fn cosine_identical_is_one() {
        let v = vocab_with(&[("alpha", 1.3), ("beta", 0.4)], 3);
        let a = vectorize("alpha beta beta", &v);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_disjoint_and_empty_are_zero() {
        let v = vocab_with(&[("alpha", 1.0), ("beta", 1.0)], 2);
        let a = vectorize("alpha", &v);
        let b = vectorize("beta", &v);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &SparseVector::new()), 0.0);
    }

    #[test]
    fn cosine_stays_in_unit_range() {
        let v = vocab_with(&[("alpha", 1.0), ("beta", 2.0), ("gamma", 0.5)], 3);
        let a = vectorize("alpha beta gamma gamma", &v);
        let b = vectorize("beta gamma", &v);
        let s = cosine_similarity(&a, &b);
        assert!(s > 0.0 && s <= 1.0 + 1e-12);
        assert!((s - cosine_similarity(&b, &a)).abs() < 1e-12);
    }
}
