//! Extraction orchestrator — bytes in, `ExtractedDocument` out.
//!
//! Validates structure before parsing, runs the blocking parse off the
//! async runtime, and enforces a hard wall-clock timeout so a hostile
//! or broken document can never hang the caller.

use std::time::Duration;

use super::format::{detect_format, FileCategory};
use super::pdf::PdfTextExtractor;
use super::quality::assess_quality;
use super::sanitize::tidy_extracted_text;
use super::types::{ExtractedDocument, PageText};
use super::{ExtractionError, ExtractionErrorKind};
use crate::config;

/// Total extracted text beyond this is refused rather than buffered.
const MAX_EXTRACTED_TEXT_BYTES: usize = 8 * 1024 * 1024;

/// Document text extractor with a hard wall-clock timeout.
pub struct DocumentTextExtractor {
    timeout: Duration,
}

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(config::EXTRACTION_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Extract plain text and quality metadata from an uploaded document.
    ///
    /// Either fully succeeds (at least one page, non-empty text) or fails
    /// with a typed error — never a silent partial result.
    pub async fn extract(&self, bytes: Vec<u8>) -> Result<ExtractedDocument, ExtractionError> {
        if bytes.len() < config::MIN_DOCUMENT_BYTES {
            return Err(ExtractionError::new(
                ExtractionErrorKind::TooSmall,
                format!("{} bytes, need at least {}", bytes.len(), config::MIN_DOCUMENT_BYTES),
            ));
        }

        let format = detect_format(&bytes);
        match format.category {
            FileCategory::Pdf | FileCategory::PlainText => {}
            FileCategory::Image => {
                // JPEG/PNG are accepted at the upload boundary but carry no
                // text layer; transcription belongs to manual entry.
                return Err(ExtractionError::of_kind(ExtractionErrorKind::NotADocument));
            }
            FileCategory::Unsupported => {
                return Err(ExtractionError::new(
                    ExtractionErrorKind::NotADocument,
                    format!("unrecognized content ({})", format.mime_type),
                ));
            }
        }

        let category = format.category;
        let parse = tokio::task::spawn_blocking(move || parse_pages(category, &bytes));

        let raw_pages = match tokio::time::timeout(self.timeout, parse).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(ExtractionError::new(
                    ExtractionErrorKind::Unknown,
                    format!("extraction task failed: {join_err}"),
                ));
            }
            Err(_) => {
                return Err(ExtractionError::new(
                    ExtractionErrorKind::Timeout,
                    format!("extraction exceeded {}s", self.timeout.as_secs()),
                ));
            }
        };

        let total_bytes: usize = raw_pages.iter().map(|p| p.len()).sum();
        if total_bytes > MAX_EXTRACTED_TEXT_BYTES {
            return Err(ExtractionError::new(
                ExtractionErrorKind::MemoryLimit,
                format!("{total_bytes} bytes of text exceeds the processing limit"),
            ));
        }

        let pages: Vec<PageText> = raw_pages
            .iter()
            .enumerate()
            .map(|(index, text)| PageText {
                index,
                raw_text: tidy_extracted_text(text),
            })
            .filter(|p| !p.raw_text.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(ExtractionError::of_kind(ExtractionErrorKind::EmptyFile));
        }

        // Re-number after dropping empty pages so indexes stay contiguous.
        let pages: Vec<PageText> = pages
            .into_iter()
            .enumerate()
            .map(|(index, p)| PageText {
                index,
                raw_text: p.raw_text,
            })
            .collect();

        let quality = assess_quality(&pages);
        tracing::debug!(
            pages = pages.len(),
            avg_chars = quality.average_chars_per_page,
            meaningful = quality.contains_meaningful_text,
            "Document extracted"
        );

        Ok(ExtractedDocument { pages, quality })
    }
}

impl Default for DocumentTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_pages(category: FileCategory, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    match category {
        FileCategory::Pdf => PdfTextExtractor.extract_pages(bytes),
        FileCategory::PlainText => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            Ok(vec![text])
        }
        _ => Err(ExtractionError::of_kind(ExtractionErrorKind::NotADocument)),
    }
}
