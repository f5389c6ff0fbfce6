//! Pluggable plain-text extraction for binary document formats.
//!
//! Extractors are looked up by lowercase file extension. An extension with no
//! extractor is simply unsupported; files with it are skipped.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Turns raw file bytes into plain text.
pub trait Extractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&[u8]) -> Result<String, ExtractError> + Send + Sync,
{
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        self(bytes)
    }
}

#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn Extractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut exts: Vec<&String> = self.by_extension.keys().collect();
        exts.sort();
        f.debug_struct("ExtractorRegistry").field("extensions", &exts).finish()
    }
}

impl ExtractorRegistry {
    /// Empty registry: only plain-text formats will be indexed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every extractor compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "docx")]
        registry.register("docx", DocxExtractor);
        #[cfg(feature = "pdf")]
        registry.register("pdf", PdfExtractor);
        registry
    }

    /// Register (or replace) the extractor for `extension` (with or without the dot).
    pub fn register(&mut self, extension: &str, extractor: impl Extractor + 'static) {
        self.by_extension
            .insert(normalize_extension(extension), Arc::new(extractor));
    }

    /// Drop the extractor for `extension`. Files with it are skipped afterwards.
    pub fn remove(&mut self, extension: &str) -> bool {
        self.by_extension
            .remove(&normalize_extension(extension))
            .is_some()
    }

    pub fn get(&self, extension: &str) -> Option<&dyn Extractor> {
        self.by_extension
            .get(&normalize_extension(extension))
            .map(|e| e.as_ref())
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.by_extension.contains_key(&normalize_extension(extension))
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid {format} document: {message}")]
    InvalidFormat { format: &'static str, message: String },
    #[error("no extractable text")]
    Empty,
    #[error("extraction failed: {0}")]
    Other(String),
}

/// Reads the paragraphs of `word/document.xml` from a DOCX archive.
#[cfg(feature = "docx")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

#[cfg(feature = "docx")]
impl Extractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        use std::io::Read;

        let invalid = |message: String| ExtractError::InvalidFormat {
            format: "docx",
            message,
        };
        let mut archive =
            zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| invalid(e.to_string()))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| invalid(e.to_string()))?
            .read_to_string(&mut xml)
            .map_err(|e| invalid(e.to_string()))?;

        let text = docx_xml_text(&xml);
        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}

/// Concatenates `<w:t>` runs; `</w:p>` ends a line, `<w:tab/>` and `<w:br/>` become whitespace.
#[cfg(feature = "docx")]
fn docx_xml_text(xml: &str) -> String {
    let mut out = String::new();
    let mut rest = xml;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        let after = &rest[open + close + 1..];
        let name = tag.split_whitespace().next().unwrap_or("");
        match name {
            "w:t" => {
                let end = after.find("</w:t>").unwrap_or(after.len());
                out.push_str(&unescape_xml(&after[..end]));
                rest = &after[end..];
                continue;
            }
            "/w:p" => out.push('\n'),
            "w:tab/" | "w:tab" => out.push('\t'),
            "w:br/" | "w:br" => out.push('\n'),
            _ => {}
        }
        rest = after;
    }
    out
}

#[cfg(feature = "docx")]
fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// PDF text via `pdf-extract`.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
impl Extractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            ExtractError::InvalidFormat {
                format: "pdf",
                message: e.to_string(),
            }
        })?;
        if text.trim().is_empty() {
            // image-only or encrypted
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}
