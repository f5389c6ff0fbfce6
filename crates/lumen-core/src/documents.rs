//! Discovering and reading documents to index.
//!
//! Plain-text formats are read directly; binary formats go through the
//! [`ExtractorRegistry`]. Markdown frontmatter (a leading YAML mapping between
//! `---` lines) is stripped from the body and its keys become chunk metadata.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::chunks::Metadata;
use crate::extract::{ExtractError, ExtractorRegistry};

/// Largest file we will read, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Default recursion depth for directory ingestion.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Extensions read as UTF-8 text (lossy).
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "mdx", "rst", "org", "csv", "tsv", "json", "yaml", "yml", "toml",
    "xml", "html", "htm", "css", "log", "ini", "cfg", "conf", "sh", "bash", "zsh", "ps1", "bat",
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "c", "h", "cpp", "hpp", "cs",
    "rb", "php", "swift", "sql", "lua", "r", "scala", "vue", "svelte", "tex",
];

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Infrastructure directories never worth indexing.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules", ".git", ".svn", ".hg", "target", "dist", "build", "out", "__pycache__",
    ".venv", "venv", ".idea", ".vscode", ".next", ".cache", "coverage", "vendor",
];

/// A file read into plain text, ready to chunk.
#[derive(Debug, Clone)]
pub struct Document {
    /// Absolute path; becomes the chunk source.
    pub path: PathBuf,
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn source(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Reads single files under a size limit with the configured extractors.
#[derive(Debug, Clone, Copy)]
pub struct DocumentReader<'a> {
    extractors: &'a ExtractorRegistry,
    max_file_size: u64,
}

impl<'a> DocumentReader<'a> {
    pub fn new(extractors: &'a ExtractorRegistry, max_file_size: u64) -> Self {
        Self {
            extractors,
            max_file_size,
        }
    }

    /// True if the extension is plain text or has a registered extractor.
    pub fn is_supported(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        TEXT_EXTENSIONS.contains(&ext.as_str()) || self.extractors.supports(&ext)
    }

    pub fn read(&self, path: &Path) -> Result<Document, IngestError> {
        let path = std::path::absolute(path).map_err(|e| IngestError::Read(path.to_path_buf(), e))?;
        let meta = std::fs::metadata(&path).map_err(|e| IngestError::Read(path.clone(), e))?;
        if !meta.is_file() {
            return Err(IngestError::NotAFile(path));
        }
        if meta.len() > self.max_file_size {
            return Err(IngestError::TooLarge {
                path,
                size: meta.len(),
                limit: self.max_file_size,
            });
        }

        let ext = extension_of(&path);
        let raw_text = if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            let bytes = std::fs::read(&path).map_err(|e| IngestError::Read(path.clone(), e))?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else if let Some(extractor) = self.extractors.get(&ext) {
            let bytes = std::fs::read(&path).map_err(|e| IngestError::Read(path.clone(), e))?;
            extractor
                .extract(&bytes)
                .map_err(|e| IngestError::Extract(path.clone(), e))?
        } else {
            return Err(IngestError::Unsupported(path));
        };

        let mut metadata = Metadata::new();
        let text = if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            match parse_frontmatter(&raw_text, &path) {
                Some((front, body)) => {
                    metadata.extend(front);
                    body
                }
                None => raw_text,
            }
        } else {
            raw_text
        };

        if let Some(name) = path.file_name() {
            metadata.insert("fileName".into(), name.to_string_lossy().into_owned().into());
        }
        metadata.insert("extension".into(), ext.into());
        metadata.insert("sizeBytes".into(), meta.len().into());
        metadata.insert("indexedAt".into(), chrono::Utc::now().to_rfc3339().into());

        Ok(Document {
            path,
            text,
            metadata,
        })
    }
}

/// Files found under a root, plus any entries the walk could not read.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub errors: Vec<String>,
}

/// Walks `root` up to `max_depth`, skipping hidden entries and `ignored_dirs`.
/// Does not follow symlinks into directories (walkdir default).
pub fn discover_files(
    root: &Path,
    max_depth: usize,
    ignored_dirs: &[String],
) -> Result<Discovery, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::NotADirectory(root.to_path_buf()));
    }
    let mut discovery = Discovery::default();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_ignored_dir(e, ignored_dirs)))
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => discovery.files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => discovery.errors.push(e.to_string()),
        }
    }
    discovery.files.sort();
    Ok(discovery)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_ignored_dir(entry: &walkdir::DirEntry, ignored: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| ignored.iter().any(|i| i == name))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Splits optional YAML frontmatter (between a leading `---` line and the next
/// `---` line) from the body.
fn split_frontmatter(content: &str) -> (Option<&str>, String) {
    let s = content.trim_start();
    let Some(after_first) = s.strip_prefix("---") else {
        return (None, content.to_string());
    };
    match after_first.find("\n---") {
        Some(end) => {
            let yaml = after_first[..end].trim();
            let body = after_first[end + 4..].trim_start_matches('-').trim_start();
            (Some(yaml), body.to_string())
        }
        None => (None, content.to_string()),
    }
}

/// Frontmatter keys and the remaining body, when the leading block is a YAML
/// mapping. Any other leading `---` block is ordinary content and is kept.
fn parse_frontmatter(
    content: &str,
    path: &Path,
) -> Option<(serde_json::Map<String, serde_json::Value>, String)> {
    let (front, body) = split_frontmatter(content);
    let front = front?;
    match serde_yaml::from_str::<serde_json::Value>(front) {
        Ok(serde_json::Value::Object(map)) => Some((map, body)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "leading block is not frontmatter");
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("file too large: {path} ({size} bytes, limit {limit})")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("could not extract text from {0}: {1}")]
    Extract(PathBuf, ExtractError),
}

impl IngestError {
    /// Size and type rejections are skips, not failures, during directory ingestion.
    pub fn is_skip(&self) -> bool {
        matches!(self, IngestError::TooLarge { .. } | IngestError::Unsupported(_))
    }
}
