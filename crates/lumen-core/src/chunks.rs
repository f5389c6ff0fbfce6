//! Splits document text into overlapping word windows for retrieval.
//! Short documents stay whole; long ones become windows of `chunk_size` words
//! sharing `overlap` words with their neighbour, so a sentence straddling a
//! boundary is still whole in one chunk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::vectorize::SparseVector;

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 512;
/// Default number of words shared by consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;

/// Characters of chunk text that feed the chunk id.
const ID_PREFIX_CHARS: usize = 100;

/// Free-form per-chunk data supplied by callers (file name, frontmatter, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A retrievable span of a document, with its TF-IDF vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub text: String,
    /// Absolute file path, or a caller tag for ad hoc text.
    pub source: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Recomputed whenever the corpus IDF changes; empty until the first recompute.
    #[serde(default)]
    pub vector: SparseVector,
}

impl Chunk {
    /// Position of this chunk within its source, if recorded.
    pub fn chunk_index(&self) -> Option<u64> {
        self.metadata.get("chunkIndex").and_then(|v| v.as_u64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Words the window start moves forward each step. An overlap that
    /// would stop the window from advancing is ignored, so the step is a
    /// whole chunk.
    pub fn step(&self) -> usize {
        let size = self.chunk_size.max(1);
        if self.overlap >= size {
            size
        } else {
            size - self.overlap
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Chunk size is at least one word; an overlap of a full chunk or more becomes 0.
    pub fn new(config: ChunkerConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        let overlap = if config.overlap >= chunk_size { 0 } else { config.overlap };
        Self {
            config: ChunkerConfig {
                chunk_size,
                overlap,
            },
        }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Chunk `text` from `source`. Each chunk gets a copy of `metadata` plus
    /// `chunkIndex` and `totalChunks`. Vectors are left empty.
    pub fn chunk(&self, text: &str, source: &str, metadata: &Metadata) -> Vec<Chunk> {
        let texts = self.split_windows(text);
        let total = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let mut meta = metadata.clone();
                meta.insert("chunkIndex".to_string(), i.into());
                meta.insert("totalChunks".to_string(), total.into());
                Chunk {
                    id: chunk_id(&t, i),
                    text: t,
                    source: source.to_string(),
                    metadata: meta,
                    vector: SparseVector::new(),
                }
            })
            .collect()
    }

    /// Window texts for `text`, without building chunks.
    fn split_windows(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        if words.len() <= self.config.chunk_size {
            return vec![text.trim().to_string()];
        }

        let step = self.config.step();
        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.config.chunk_size).min(words.len());
            windows.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start += step;
        }
        windows
    }
}

/// Deterministic id from the text prefix and ordinal, so re-chunking the same
/// content yields the same ids.
pub fn chunk_id(text: &str, index: usize) -> String {
    let prefix: String = text.chars().take(ID_PREFIX_CHARS).collect();
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b":");
    hasher.update(index.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size: size,
            overlap,
        })
    }

    #[test]
    fn short_text_is_one_chunk() {
        let c = Chunker::default().chunk("  One paragraph.  ", "doc", &Metadata::new());
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].text, "One paragraph.");
        assert_eq!(c[0].chunk_index(), Some(0));
        assert_eq!(c[0].source, "doc");
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(Chunker::default().chunk(" \n\t", "doc", &Metadata::new()).is_empty());
    }

    #[test]
    fn long_text_windows_overlap() {
        let c = chunker(10, 3).chunk(&words(25), "doc", &Metadata::new());
        // starts at 0, 7, 14, 21 (21..25 reaches the end)
        assert_eq!(c.len(), 4);
        assert!(c[0].text.starts_with("w0 ") && c[0].text.ends_with(" w9"));
        assert!(c[1].text.starts_with("w7 "));
        assert!(c[3].text.ends_with("w24"));
        assert_eq!(c[3].metadata["totalChunks"], serde_json::json!(4));
    }

    #[test]
    fn windows_cover_every_word() {
        let text = words(1300);
        let c = Chunker::default().chunk(&text, "doc", &Metadata::new());
        let step = ChunkerConfig::default().step();
        let mut rebuilt: Vec<String> = Vec::new();
        for (i, ch) in c.iter().enumerate() {
            let ws: Vec<String> = ch.text.split_whitespace().map(str::to_string).collect();
            if i == 0 {
                rebuilt.extend(ws);
            } else {
                let already = rebuilt.len() - i * step;
                rebuilt.extend(ws.into_iter().skip(already));
            }
        }
        let original: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn overlap_not_smaller_than_size_steps_a_whole_chunk() {
        let c = chunker(4, 10).chunk(&words(8), "doc", &Metadata::new());
        assert_eq!(c.len(), 2);
        assert_eq!(c[1].text, "w4 w5 w6 w7");
        assert_eq!(chunker(4, 10).config().overlap, 0);

        let big = chunker(100, 100).chunk(&words(1000), "doc", &Metadata::new());
        assert_eq!(big.len(), 10);
    }

    #[test]
    fn ids_are_deterministic() {
        let a = chunker(10, 2).chunk(&words(30), "a", &Metadata::new());
        let b = chunker(10, 2).chunk(&words(30), "b", &Metadata::new());
        let ids_a: Vec<_> = a.iter().map(|c| c.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(ids_a[0].len(), 16);
        assert_ne!(ids_a[0], ids_a[1]);
    }

    #[test]
    fn caller_metadata_is_kept() {
        let mut meta = Metadata::new();
        meta.insert("lang".into(), "en".into());
        let c = Chunker::default().chunk("hello there world", "doc", &meta);
        assert_eq!(c[0].metadata["lang"], serde_json::json!("en"));
    }
}
