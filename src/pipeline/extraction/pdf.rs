use super::{ExtractionError, ExtractionErrorKind};

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Extract per-page text. Page order follows the document.
    pub fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes).map_err(map_pdf_error)
    }
}

/// Map a pdf-extract failure onto our error taxonomy.
///
/// The crate reports encryption through its error text, so the match is
/// on the rendered message rather than variants.
fn map_pdf_error(err: pdf_extract::OutputError) -> ExtractionError {
    let detail = err.to_string();
    ExtractionError::new(kind_for_detail(&detail), detail)
}

fn kind_for_detail(detail: &str) -> ExtractionErrorKind {
    let lowered = detail.to_lowercase();
    if lowered.contains("encrypt") || lowered.contains("password") {
        ExtractionErrorKind::PasswordProtected
    } else {
        ExtractionErrorKind::CorruptFile
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::make_test_pdf;
    use super::*;

    #[test]
    fn extract_text_from_digital_pdf() {
        let extractor = PdfTextExtractor;
        let pdf_bytes = make_test_pdf("Potassium 4.2 mmol per litre");
        let pages = extractor.extract_pages(&pdf_bytes).unwrap();

        assert!(!pages.is_empty(), "Should extract at least one page");
        let full_text: String = pages.concat();
        assert!(
            full_text.contains("Potassium") || full_text.contains("4.2"),
            "Expected lab text, got: {full_text}"
        );
    }

    #[test]
    fn invalid_pdf_maps_to_corrupt_file() {
        let extractor = PdfTextExtractor;
        let err = extractor.extract_pages(b"%PDF-1.4 but not really").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::CorruptFile);
    }

    #[test]
    fn encryption_detail_maps_to_password_protected() {
        assert_eq!(
            kind_for_detail("the file is encrypted"),
            ExtractionErrorKind::PasswordProtected
        );
        assert_eq!(
            kind_for_detail("Password required to decrypt"),
            ExtractionErrorKind::PasswordProtected
        );
        assert_eq!(
            kind_for_detail("unexpected end of stream"),
            ExtractionErrorKind::CorruptFile
        );
    }
}
