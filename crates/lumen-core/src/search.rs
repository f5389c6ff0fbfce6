//! Cosine ranking over stored chunk vectors, and prompt-context formatting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunks::{Chunk, Metadata};
use crate::vectorize::{cosine_similarity, SparseVector};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_SCORE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub top_k: usize,
    pub min_score: f64,
    /// Keep only chunks whose source contains this substring.
    #[serde(default)]
    pub source_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            source_filter: None,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_source_filter(mut self, filter: impl Into<String>) -> Self {
        self.source_filter = Some(filter.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub text: String,
    pub source: String,
    pub metadata: Metadata,
    pub score: f64,
}

/// Score `chunks` against `query`, best first. Equal scores keep insertion order.
pub fn rank<'a>(
    query: &SparseVector,
    chunks: impl IntoIterator<Item = &'a Chunk>,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    if query.is_empty() || options.top_k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f64, &Chunk)> = chunks
        .into_iter()
        .filter(|c| match &options.source_filter {
            Some(f) => c.source.contains(f.as_str()),
            None => true,
        })
        .map(|c| (cosine_similarity(query, &c.vector), c))
        .filter(|(score, _)| *score >= options.min_score)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(options.top_k);

    scored
        .into_iter()
        .map(|(score, c)| SearchResult {
            text: c.text.clone(),
            source: c.source.clone(),
            metadata: c.metadata.clone(),
            score,
        })
        .collect()
}

/// Format results as a block ready to paste into a prompt. Returns an empty
/// string when there is nothing to add.
pub fn format_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {} (relevance {}%)\n{}",
                i + 1,
                source_basename(&r.source),
                (r.score * 100.0).round() as i64,
                r.text
            )
        })
        .collect();
    format!(
        "Relevant context from indexed documents:\n\n{}",
        blocks.join("\n\n---\n\n")
    )
}

/// File name of a path-like source; caller tags come back unchanged.
pub fn source_basename(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}
