//! On-disk snapshot of an [`IndexStore`]: a chunks file and a vocabulary file
//! in one directory, always written together.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunks::Chunk;
use crate::store::IndexStore;
use crate::vocabulary::Vocabulary;

pub const CHUNKS_FILENAME: &str = "rag_chunks.json";
pub const VOCABULARY_FILENAME: &str = "rag_vocabulary.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunksFile {
    #[serde(default)]
    chunks: Vec<Chunk>,
    #[serde(default)]
    total_documents: usize,
    #[serde(default)]
    updated_at: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VocabularyFile {
    /// term → idf
    #[serde(default)]
    vocabulary: HashMap<String, f64>,
    #[serde(default)]
    doc_frequency: HashMap<String, usize>,
}

/// Reads and writes the snapshot files under `dir`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILENAME)
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        self.dir.join(VOCABULARY_FILENAME)
    }

    /// Load both files. A missing file leaves its part empty. The saved
    /// vocabulary is checked against the loaded chunks; when the two disagree
    /// (one file missing, or files from different saves) document frequency
    /// is recounted from the chunks and vectors are recomputed, so nothing
    /// stale reaches a query.
    pub fn load(&self) -> Result<IndexStore, PersistError> {
        let chunks_file: Option<ChunksFile> = read_json(&self.chunks_path())?;
        let vocab_file: Option<VocabularyFile> = read_json(&self.vocabulary_path())?;

        let chunks_file = chunks_file.unwrap_or_default();
        let vocab_file = vocab_file.unwrap_or_default();

        let vocabulary = Vocabulary {
            document_frequency: vocab_file.doc_frequency,
            idf: vocab_file.vocabulary,
            total_documents: chunks_file.total_documents,
        };
        let mut store =
            IndexStore::from_parts(chunks_file.chunks, vocabulary, chunks_file.updated_at);

        let mut counted = Vocabulary::new();
        counted.rebuild(store.chunks.iter());
        let idf_matches = store.vocabulary.idf.len() == counted.document_frequency.len()
            && counted
                .document_frequency
                .keys()
                .all(|t| store.vocabulary.idf.contains_key(t));
        if counted.document_frequency != store.vocabulary.document_frequency || !idf_matches {
            tracing::warn!(
                dir = %self.dir.display(),
                chunks = store.chunks.len(),
                "vocabulary does not match chunks; rebuilding"
            );
            store.vocabulary.document_frequency = counted.document_frequency;
            store.recompute();
        }
        Ok(store)
    }

    /// Write both files, each through a temp file and rename.
    pub fn save(&self, store: &IndexStore) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PersistError::Io(self.dir.clone(), e))?;

        let chunks_file = ChunksFileRef {
            chunks: &store.chunks,
            total_documents: store.vocabulary.total_documents,
            updated_at: store.updated_at,
        };
        let vocab_file = VocabularyFileRef {
            vocabulary: &store.vocabulary.idf,
            doc_frequency: &store.vocabulary.document_frequency,
        };
        write_json(&self.chunks_path(), &chunks_file)?;
        write_json(&self.vocabulary_path(), &vocab_file)?;
        Ok(())
    }
}

// Borrowing twins of the file structs, so saving never clones the corpus.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunksFileRef<'a> {
    chunks: &'a [Chunk],
    total_documents: usize,
    updated_at: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VocabularyFileRef<'a> {
    vocabulary: &'a HashMap<String, f64>,
    doc_frequency: &'a HashMap<String, usize>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistError::Io(path.to_path_buf(), e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PersistError::Parse(path.to_path_buf(), e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_vec(value).map_err(|e| PersistError::Serialize(path.to_path_buf(), e))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| PersistError::Io(tmp.clone(), e))?;
    std::fs::rename(&tmp, path).map_err(|e| PersistError::Io(path.to_path_buf(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("snapshot I/O on {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("corrupt snapshot {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to serialize {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{Chunker, Metadata};

    fn sample_store() -> IndexStore {
        let mut store = IndexStore::new();
        for (text, source) in [("solar panels charge batteries", "a"), ("wind turbines spin", "b")] {
            store.add_document(Chunker::default().chunk(text, source, &Metadata::new()));
        }
        store.recompute();
        store
    }

    #[test]
    fn missing_files_load_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path().join("nope")).load().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.vocabulary().total_documents, 0);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = SnapshotStore::new(tmp.path());
        let store = sample_store();
        snap.save(&store).unwrap();
        let loaded = snap.load().unwrap();
        assert_eq!(loaded.chunks(), store.chunks());
        assert_eq!(loaded.vocabulary(), store.vocabulary());
        assert_eq!(loaded.updated_at(), store.updated_at());
        assert!(!tmp.path().join("rag_chunks.json.tmp").exists());
    }

    #[test]
    fn files_use_camel_case_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = SnapshotStore::new(tmp.path());
        snap.save(&sample_store()).unwrap();
        let chunks: serde_json::Value =
            serde_json::from_slice(&std::fs::read(snap.chunks_path()).unwrap()).unwrap();
        assert_eq!(chunks["totalDocuments"], 2);
        assert!(chunks["updatedAt"].as_i64().is_some());
        assert_eq!(chunks["chunks"][0]["metadata"]["chunkIndex"], 0);
        let vocab: serde_json::Value =
            serde_json::from_slice(&std::fs::read(snap.vocabulary_path()).unwrap()).unwrap();
        assert_eq!(vocab["docFrequency"]["solar"], 1);
        assert!(vocab["vocabulary"]["solar"].as_f64().is_some());
    }

    #[test]
    fn missing_vocabulary_is_rebuilt() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = SnapshotStore::new(tmp.path());
        let store = sample_store();
        snap.save(&store).unwrap();
        std::fs::remove_file(snap.vocabulary_path()).unwrap();
        let loaded = snap.load().unwrap();
        assert_eq!(
            loaded.vocabulary().document_frequency,
            store.vocabulary().document_frequency
        );
        assert_eq!(loaded.chunks()[0].vector, store.chunks()[0].vector);
    }

    #[test]
    fn missing_chunks_drop_stale_vocabulary() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = SnapshotStore::new(tmp.path());
        snap.save(&sample_store()).unwrap();
        std::fs::remove_file(snap.chunks_path()).unwrap();
        let loaded = snap.load().unwrap();
        assert!(loaded.is_empty());
        assert!(loaded.vocabulary().document_frequency.is_empty());
        assert_eq!(loaded.stats().vocabulary_size, 0);
    }

    #[test]
    fn mismatched_saves_are_reconciled() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = SnapshotStore::new(tmp.path());
        snap.save(&sample_store()).unwrap();
        let vocab = std::fs::read(snap.vocabulary_path()).unwrap();

        let mut other = IndexStore::new();
        other.add_document(Chunker::default().chunk("tidal generators hum", "c", &Metadata::new()));
        other.recompute();
        snap.save(&other).unwrap();
        // vocabulary from the earlier save next to the later chunks
        std::fs::write(snap.vocabulary_path(), vocab).unwrap();

        let loaded = snap.load().unwrap();
        assert_eq!(loaded.vocabulary().document_frequency, other.vocabulary().document_frequency);
        assert!(!loaded.vocabulary().idf.contains_key("solar"));
        assert_eq!(loaded.chunks()[0].vector, other.chunks()[0].vector);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = SnapshotStore::new(tmp.path());
        std::fs::write(snap.chunks_path(), b"{ not json").unwrap();
        assert!(matches!(snap.load(), Err(PersistError::Parse(..))));
    }
}
