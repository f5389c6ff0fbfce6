//! Index pipeline: read → chunk → add to store → recompute → persist.
//!
//! [`RagIndex`] owns the store behind a read-write lock. Every mutation holds
//! the write guard from the first change through recompute and persist, so a
//! search never sees a half-updated vocabulary.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::chunks::{Chunker, ChunkerConfig, Metadata};
use crate::config::{Config, DEFAULT_MIN_TEXT_LEN};
use crate::documents::{
    discover_files, Document, DocumentReader, IngestError, DEFAULT_IGNORED_DIRS,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILE_SIZE,
};
use crate::extract::ExtractorRegistry;
use crate::search::{format_context, SearchOptions, SearchResult};
use crate::snapshot::SnapshotStore;
use crate::store::{IndexStats, IndexStore};

/// Engine tuning, usually derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSettings {
    pub chunker: ChunkerConfig,
    pub min_text_len: usize,
    pub max_file_size: u64,
    pub max_depth: usize,
    pub ignored_dirs: Vec<String>,
    pub search: SearchOptions,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            search: SearchOptions::default(),
        }
    }
}

impl From<&Config> for IndexSettings {
    fn from(config: &Config) -> Self {
        Self {
            chunker: ChunkerConfig {
                chunk_size: config.chunk_size,
                overlap: config.chunk_overlap,
            },
            min_text_len: config.min_text_len,
            max_file_size: config.max_file_size,
            max_depth: config.max_depth,
            ignored_dirs: config.ignored_dirs.clone(),
            search: SearchOptions {
                top_k: config.top_k,
                min_score: config.min_score,
                source_filter: None,
            },
        }
    }
}

/// Outcome of a directory ingestion. Per-file failures land in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryReport {
    pub indexed: usize,
    pub skipped: usize,
    pub chunks: usize,
    pub errors: Vec<String>,
}

/// The retrieval engine: an [`IndexStore`] plus optional on-disk snapshot.
#[derive(Debug)]
pub struct RagIndex {
    store: RwLock<IndexStore>,
    snapshot: Option<SnapshotStore>,
    extractors: ExtractorRegistry,
    chunker: Chunker,
    settings: IndexSettings,
}

impl RagIndex {
    /// Engine with no persistence, for tests and throwaway corpora.
    pub fn in_memory(settings: IndexSettings) -> Self {
        Self::with_store(IndexStore::new(), None, settings)
    }

    /// Open the snapshot in `dir`, or start empty if it is missing or unreadable.
    pub fn open(dir: impl Into<PathBuf>, settings: IndexSettings) -> Self {
        let snapshot = SnapshotStore::new(dir);
        let store = match snapshot.load() {
            Ok(store) => {
                tracing::info!(
                    dir = %snapshot.dir().display(),
                    chunks = store.len(),
                    "loaded index snapshot"
                );
                store
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not load index snapshot; starting empty");
                IndexStore::new()
            }
        };
        Self::with_store(store, Some(snapshot), settings)
    }

    fn with_store(store: IndexStore, snapshot: Option<SnapshotStore>, settings: IndexSettings) -> Self {
        Self {
            store: RwLock::new(store),
            snapshot,
            extractors: ExtractorRegistry::with_defaults(),
            chunker: Chunker::new(settings.chunker),
            settings,
        }
    }

    /// Replace the extractor registry (e.g. to add a PDF extractor).
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn extractors_mut(&mut self) -> &mut ExtractorRegistry {
        &mut self.extractors
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Index ad hoc text under a caller tag. Text shorter than the minimum
    /// length is ignored. Returns the number of chunks added.
    pub fn index_text(&self, text: &str, source: &str, metadata: &Metadata) -> usize {
        let mut store = self.write();
        let added = self.add_text(&mut store, text, source, metadata);
        if added > 0 {
            self.commit(&mut store);
        }
        added
    }

    /// Index one file, replacing any chunks it produced before.
    pub fn index_file(&self, path: &Path, metadata: &Metadata) -> Result<usize, IngestError> {
        let doc = self.reader().read(path)?;
        let mut store = self.write();
        let (removed, added) = self.apply_document(&mut store, doc, metadata);
        if removed > 0 || added > 0 {
            self.commit(&mut store);
        }
        Ok(added)
    }

    /// Index every supported file under `root`, at most `max_depth` levels
    /// deep (`None` uses the configured depth). One bad file never stops the walk.
    pub fn index_directory(
        &self,
        root: &Path,
        max_depth: Option<usize>,
    ) -> Result<DirectoryReport, IngestError> {
        let depth = max_depth.unwrap_or(self.settings.max_depth);
        let discovery = discover_files(root, depth, &self.settings.ignored_dirs)?;
        let mut report = DirectoryReport {
            errors: discovery.errors,
            ..DirectoryReport::default()
        };

        // read and extract without holding the lock
        let reader = self.reader();
        let mut docs: Vec<Document> = Vec::new();
        for path in &discovery.files {
            if !reader.is_supported(path) {
                report.skipped += 1;
                continue;
            }
            match reader.read(path) {
                Ok(doc) => docs.push(doc),
                Err(e) if e.is_skip() => {
                    tracing::debug!(error = %e, "skipping file");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read file");
                    report.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        let mut store = self.write();
        let mut changed = false;
        let empty = Metadata::new();
        for doc in docs {
            let (removed, added) = self.apply_document(&mut store, doc, &empty);
            changed |= removed > 0 || added > 0;
            if added > 0 {
                report.indexed += 1;
                report.chunks += added;
            } else {
                report.skipped += 1;
            }
        }
        if changed {
            self.commit(&mut store);
        }
        drop(store);

        tracing::info!(
            root = %root.display(),
            indexed = report.indexed,
            skipped = report.skipped,
            chunks = report.chunks,
            errors = report.errors.len(),
            "directory indexed"
        );
        Ok(report)
    }

    /// Drop every chunk from `path`. Returns whether anything was removed.
    pub fn remove_file(&self, path: &Path) -> bool {
        let source = source_for_path(path);
        let mut store = self.write();
        let removed = store.remove_source(&source);
        if removed > 0 {
            tracing::info!(source = %source, chunks = removed, "removed source");
            self.commit(&mut store);
        }
        removed > 0
    }

    /// Drop every chunk from an ad hoc `source` tag.
    pub fn remove_source(&self, source: &str) -> bool {
        let mut store = self.write();
        let removed = store.remove_source(source);
        if removed > 0 {
            self.commit(&mut store);
        }
        removed > 0
    }

    /// Empty the index and persist the empty state.
    pub fn clear(&self) {
        let mut store = self.write();
        store.clear();
        tracing::info!("index cleared");
        self.persist(&store);
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let results = self.read().search(query, options);
        tracing::debug!(query, hits = results.len(), "search");
        results
    }

    /// Search with the configured defaults.
    pub fn search_default(&self, query: &str) -> Vec<SearchResult> {
        self.search(query, &self.settings.search)
    }

    /// Search results formatted for a prompt; empty when nothing is relevant.
    pub fn get_context(&self, query: &str, options: &SearchOptions) -> String {
        format_context(&self.search(query, options))
    }

    pub fn stats(&self) -> IndexStats {
        self.read().stats()
    }

    fn reader(&self) -> DocumentReader<'_> {
        DocumentReader::new(&self.extractors, self.settings.max_file_size)
    }

    /// Supersede `doc.path`'s chunks with the new document. Returns (removed, added).
    fn apply_document(&self, store: &mut IndexStore, doc: Document, extra: &Metadata) -> (usize, usize) {
        let source = doc.source();
        let removed = store.remove_source(&source);
        let mut metadata = doc.metadata;
        metadata.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        let added = self.add_text(store, &doc.text, &source, &metadata);
        tracing::info!(source = %source, removed, added, "indexed file");
        (removed, added)
    }

    fn add_text(&self, store: &mut IndexStore, text: &str, source: &str, metadata: &Metadata) -> usize {
        if text.trim().chars().count() < self.settings.min_text_len {
            tracing::debug!(source, "text below minimum length; not indexed");
            return 0;
        }
        let chunks = self.chunker.chunk(text, source, metadata);
        let added = chunks.len();
        store.add_document(chunks);
        added
    }

    fn commit(&self, store: &mut IndexStore) {
        store.recompute();
        self.persist(store);
    }

    /// Snapshot failures are logged; the in-memory store stays authoritative.
    fn persist(&self, store: &IndexStore) {
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(store) {
                tracing::warn!(error = %e, "failed to persist index snapshot");
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The chunk source used for a file path (absolute, not canonicalized).
pub fn source_for_path(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_ignored() {
        let index = RagIndex::in_memory(IndexSettings::default());
        assert_eq!(index.index_text("tiny", "t", &Metadata::new()), 0);
        assert_eq!(index.index_text("   padded   ", "t", &Metadata::new()), 0);
        assert_eq!(index.stats().total_documents, 0);
    }

    #[test]
    fn cat_and_dog_scenario() {
        let index = RagIndex::in_memory(IndexSettings::default());
        index.index_text("the cat sat on the mat", "doc1", &Metadata::new());
        index.index_text("dogs bark at cats", "doc2", &Metadata::new());

        let results = index.search_default("cat");
        assert!(!results.is_empty());
        assert_eq!(results[0].source, "doc1");
        if let Some(pos) = results.iter().position(|r| r.source == "doc2") {
            assert!(results[pos].score <= results[0].score);
        }
        assert!(index.search_default("zebra").is_empty());
    }

    #[test]
    fn remove_source_tag() {
        let index = RagIndex::in_memory(IndexSettings::default());
        index.index_text("garden tomatoes need sun", "garden", &Metadata::new());
        assert!(index.remove_source("garden"));
        assert!(!index.remove_source("garden"));
        assert_eq!(index.stats().total_chunks, 0);
    }

    #[test]
    fn context_is_empty_without_hits() {
        let index = RagIndex::in_memory(IndexSettings::default());
        assert_eq!(index.get_context("anything", &SearchOptions::default()), "");
        index.index_text("beekeeping in early spring", "bees", &Metadata::new());
        let ctx = index.get_context("beekeeping", &SearchOptions::default());
        assert!(ctx.contains("bees (relevance"));
    }

    #[test]
    fn settings_from_config() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 10,
            top_k: 3,
            ..Config::default()
        };
        let s = IndexSettings::from(&config);
        assert_eq!(s.chunker.chunk_size, 100);
        assert_eq!(s.chunker.overlap, 10);
        assert_eq!(s.search.top_k, 3);
    }
}
