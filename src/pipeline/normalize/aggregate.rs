//! Multi-page aggregation — N per-page partial results into one
//! canonical result, with the same non-emptiness guarantees as
//! `normalize` itself.

use super::normalizer::finalize;
use super::types::{
    CanonicalResult, Marker, PageSummary, DEFAULT_RECOMMENDATION_GENERAL,
    DEFAULT_RECOMMENDATION_WITH_MARKERS,
};

/// A first-page summary at least this long stands alone as the overall
/// summary instead of a bloated concatenation.
const MIN_STANDALONE_SUMMARY_CHARS: usize = 80;

/// When concatenating, only the longest few summaries are worth joining.
const MAX_JOINED_SUMMARIES: usize = 3;

/// Merge per-page normalized results into one canonical result.
///
/// Markers are unioned first-seen-wins by name, recommendations are
/// unioned preserving first-seen order, and a per-page breakdown is
/// retained for traceability.
pub fn aggregate_pages(pages: &[CanonicalResult]) -> CanonicalResult {
    if pages.is_empty() {
        return finalize(None, vec![], vec![], None);
    }

    let markers: Vec<Marker> = pages.iter().flat_map(|p| p.markers.iter().cloned()).collect();

    // Per-page normalization inserts filler guidance on pages with no
    // real recommendations; that filler does not belong in the union.
    // finalize restores a default if nothing real survives.
    let recommendations: Vec<String> = pages
        .iter()
        .flat_map(|p| p.recommendations.iter().cloned())
        .filter(|r| r != DEFAULT_RECOMMENDATION_GENERAL && r != DEFAULT_RECOMMENDATION_WITH_MARKERS)
        .collect();

    let summary = combined_summary(pages);

    let breakdown: Vec<PageSummary> = pages
        .iter()
        .enumerate()
        .map(|(i, p)| PageSummary {
            page_number: i + 1,
            summary: p.summary.clone(),
        })
        .collect();

    finalize(summary, markers, recommendations, Some(breakdown))
}

fn combined_summary(pages: &[CanonicalResult]) -> Option<String> {
    let summaries: Vec<&str> = pages
        .iter()
        .map(|p| p.summary.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let first = summaries.first()?;
    if first.chars().count() >= MIN_STANDALONE_SUMMARY_CHARS {
        return Some((*first).to_string());
    }

    // Join up to the N longest summaries, keeping page order.
    let mut ranked: Vec<usize> = (0..summaries.len()).collect();
    ranked.sort_by_key(|&i| std::cmp::Reverse(summaries[i].chars().count()));
    ranked.truncate(MAX_JOINED_SUMMARIES);
    ranked.sort_unstable();

    let joined = ranked
        .into_iter()
        .map(|i| summaries[i])
        .collect::<Vec<_>>()
        .join(" ");
    Some(joined)
}
