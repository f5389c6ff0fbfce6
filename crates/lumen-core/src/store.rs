//! In-memory index: chunks plus the vocabulary they were vectorized with.
//! Pure data structure; persistence lives in [`crate::snapshot`] and locking
//! in [`crate::index`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::chunks::Chunk;
use crate::search::{rank, source_basename, SearchOptions, SearchResult};
use crate::vectorize::vectorize;
use crate::vocabulary::Vocabulary;

/// Chunks and corpus statistics, loaded and saved together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStore {
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) vocabulary: Vocabulary,
    /// Epoch milliseconds of the last recompute.
    pub(crate) updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_chunks: usize,
    pub total_sources: usize,
    pub total_documents: usize,
    pub vocabulary_size: usize,
    /// Basenames of every source, sorted.
    pub sources: Vec<String>,
    pub updated_at: i64,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(chunks: Vec<Chunk>, vocabulary: Vocabulary, updated_at: i64) -> Self {
        Self {
            chunks,
            vocabulary,
            updated_at,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Append the chunks of one logical document. Vectors stay stale until
    /// [`recompute`](Self::recompute).
    pub fn add_document(&mut self, chunks: Vec<Chunk>) {
        for chunk in &chunks {
            self.vocabulary.observe(chunk);
        }
        self.chunks.extend(chunks);
        self.vocabulary.total_documents += 1;
    }

    /// Drop every chunk from `source`. Returns how many were removed.
    pub fn remove_source(&mut self, source: &str) -> usize {
        let (removed, kept): (Vec<Chunk>, Vec<Chunk>) = std::mem::take(&mut self.chunks)
            .into_iter()
            .partition(|c| c.source == source);
        self.chunks = kept;
        for chunk in &removed {
            self.vocabulary.forget(chunk);
        }
        removed.len()
    }

    /// Recompute IDF over the current chunk count, then every chunk vector.
    pub fn recompute(&mut self) {
        self.vocabulary.recompute_idf(self.chunks.len());
        let vocabulary = &self.vocabulary;
        for chunk in &mut self.chunks {
            chunk.vector = vectorize(&chunk.text, vocabulary);
        }
        self.updated_at = chrono::Utc::now().timestamp_millis();
        tracing::debug!(
            chunks = self.chunks.len(),
            terms = self.vocabulary.len(),
            "recomputed vectors"
        );
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.vocabulary.clear();
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let q = vectorize(query, &self.vocabulary);
        rank(&q, &self.chunks, options)
    }

    pub fn stats(&self) -> IndexStats {
        let sources: BTreeSet<&str> = self.chunks.iter().map(|c| c.source.as_str()).collect();
        let basenames: BTreeSet<String> = sources.iter().map(|s| source_basename(s)).collect();
        IndexStats {
            total_chunks: self.chunks.len(),
            total_sources: sources.len(),
            total_documents: self.vocabulary.total_documents,
            vocabulary_size: self.vocabulary.len(),
            sources: basenames.into_iter().collect(),
            updated_at: self.updated_at,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
