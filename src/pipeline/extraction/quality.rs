//! Advisory quality scoring for extracted text.
//!
//! These heuristics flag bad scans for the caller; they never gate
//! extraction success. Only a genuinely empty result is an error.

use std::sync::OnceLock;

use regex::Regex;

use super::types::{PageText, QualityMetrics};

/// Pages averaging more than this many characters read reliably.
pub const HIGH_QUALITY_CHARS_PER_PAGE: f64 = 200.0;

fn meaningful_text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z]{3,}").expect("static pattern"))
}

/// Score extracted pages. Call after whitespace tidying so counts
/// reflect what downstream analysis will actually see.
pub fn assess_quality(pages: &[PageText]) -> QualityMetrics {
    let total_chars: usize = pages.iter().map(|p| p.raw_text.chars().count()).sum();
    let page_count = pages.len().max(1);
    let average_chars_per_page = total_chars as f64 / page_count as f64;

    let contains_meaningful_text = pages
        .iter()
        .any(|p| meaningful_text_pattern().is_match(&p.raw_text));

    QualityMetrics {
        is_empty: total_chars == 0,
        contains_meaningful_text,
        average_chars_per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, text: &str) -> PageText {
        PageText {
            index,
            raw_text: text.to_string(),
        }
    }

    #[test]
    fn average_is_total_over_page_count() {
        let pages = vec![page(0, "a".repeat(300).as_str()), page(1, "b".repeat(100).as_str())];
        let q = assess_quality(&pages);
        assert!((q.average_chars_per_page - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_pages_flagged() {
        let pages = vec![page(0, ""), page(1, "")];
        let q = assess_quality(&pages);
        assert!(q.is_empty);
        assert!(!q.contains_meaningful_text);
    }

    #[test]
    fn meaningful_text_needs_three_letters() {
        let q = assess_quality(&[page(0, "4.2 10 %% ab")]);
        assert!(!q.contains_meaningful_text);

        let q = assess_quality(&[page(0, "4.2 mmol potassium")]);
        assert!(q.contains_meaningful_text);
    }

    #[test]
    fn digits_only_is_not_meaningful() {
        let q = assess_quality(&[page(0, "123 456 789 000")]);
        assert!(!q.contains_meaningful_text);
        assert!(!q.is_empty);
    }

    #[test]
    fn no_pages_counts_as_empty() {
        let q = assess_quality(&[]);
        assert!(q.is_empty);
        assert_eq!(q.average_chars_per_page, 0.0);
    }

    #[test]
    fn dense_page_rates_high_quality() {
        let text = "Patient chemistry panel results. ".repeat(20);
        let q = assess_quality(&[page(0, &text)]);
        assert!(q.is_likely_high_quality());
    }
}
