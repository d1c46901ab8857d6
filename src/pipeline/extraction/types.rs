use serde::{Deserialize, Serialize};

/// Result of text extraction from a single document.
///
/// Extraction either fully succeeds (at least one page, non-empty text)
/// or fails with an `ExtractionError` — never a silent partial result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub pages: Vec<PageText>,
    pub quality: QualityMetrics,
}

impl ExtractedDocument {
    /// All page text joined with page breaks, in page order.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.raw_text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// One page of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// Zero-based page index.
    pub index: usize,
    pub raw_text: String,
}

/// Advisory quality metadata. Low quality is not a failure — only a
/// genuinely empty result is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub is_empty: bool,
    pub contains_meaningful_text: bool,
    pub average_chars_per_page: f64,
}

impl QualityMetrics {
    /// Dense pages read reliably; sparse ones usually mean a bad scan.
    pub fn is_likely_high_quality(&self) -> bool {
        self.average_chars_per_page > super::quality::HIGH_QUALITY_CHARS_PER_PAGE
    }
}
