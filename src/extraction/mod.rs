//! Text extraction from staged source files.
//!
//! PDFs are parsed with `lopdf` on the blocking pool and their pages are concatenated in page
//! order. Plain-text circulars (`.txt`, `.md`) are read verbatim and count as a single page.

use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PLAIN_TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Errors raised while turning a staged file into text.
///
/// Messages never name the local file; callers add the source they were reading.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read from disk.
    #[error("Failed to read source file: {0}")]
    Io(#[source] std::io::Error),
    /// The file is not a readable PDF.
    #[error("Failed to parse PDF: {0}")]
    Parse(#[source] lopdf::Error),
    /// A page could not be decoded.
    #[error("Failed to extract text from page {page}: {source}")]
    Page {
        /// One-based page number.
        page: u32,
        /// Error reported by the PDF parser.
        #[source]
        source: lopdf::Error,
    },
    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Full text and page count of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Page texts concatenated in page order.
    pub text: String,
    /// Number of pages in the file.
    pub page_count: u32,
}

/// Capability that turns a local file into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of the file at `path`.
    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError>;
}

/// Extractor for PDFs, with a plain-text passthrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Construct the extractor.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        if is_plain_text(path) {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(ExtractionError::Io)?;
            return Ok(ExtractedText {
                text,
                page_count: 1,
            });
        }

        let owned = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extract_pdf(&owned)).await??;
        tracing::debug!(
            path = %path.display(),
            pages = extracted.page_count,
            chars = extracted.text.chars().count(),
            "Extracted PDF text"
        );
        Ok(extracted)
    }
}

fn is_plain_text(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PLAIN_TEXT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Parse the whole file in memory so no handle outlives this call.
fn extract_pdf(path: &Path) -> Result<ExtractedText, ExtractionError> {
    let bytes = std::fs::read(path).map_err(ExtractionError::Io)?;
    let document = Document::load_mem(&bytes).map_err(ExtractionError::Parse)?;

    let pages = document.get_pages();
    let mut text = String::new();
    for page in pages.keys().copied() {
        let page_text = document
            .extract_text(&[page])
            .map_err(|source| ExtractionError::Page { page, source })?;
        text.push_str(&page_text);
    }

    Ok(ExtractedText {
        text,
        page_count: u32::try_from(pages.len()).unwrap_or(u32::MAX),
    })
}
