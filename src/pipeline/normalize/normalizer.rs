//! `normalize` — arbitrary AI output to `CanonicalResult`.
//!
//! Total by construction: every path ends in `finalize`, which restores
//! the non-emptiness and uniqueness invariants whatever the input was.

use serde_json::Value;

use super::aggregate::aggregate_pages;
use super::shape::{classify, unwrap_envelope, ResponseShape};
use super::types::{
    truncate_for_display, CanonicalResult, Marker, PageSummary, DEFAULT_RECOMMENDATION_GENERAL,
    DEFAULT_RECOMMENDATION_WITH_MARKERS, MIN_RECOMMENDATION_CHARS, SUMMARY_DISPLAY_LIMIT,
};

/// Convert any AI output into the canonical result shape. Never fails.
pub fn normalize(raw: &Value) -> CanonicalResult {
    // Step 1: string payloads are either JSON in disguise or free text.
    if let Value::String(text) = raw {
        match serde_json::from_str::<Value>(text) {
            Ok(parsed) if parsed.is_object() || parsed.is_array() => return normalize(&parsed),
            _ => return from_plain_text(text),
        }
    }

    let payload = unwrap_envelope(raw);
    match classify(payload) {
        ResponseShape::Null | ResponseShape::Unknown => finalize(None, vec![], vec![], None),
        ResponseShape::PlainText(text) => from_plain_text(text),
        ResponseShape::PageArray(items) => {
            let pages: Vec<CanonicalResult> = items.iter().map(normalize).collect();
            aggregate_pages(&pages)
        }
        ResponseShape::Canonical(obj) => from_canonical(obj),
        ResponseShape::LooseObject(obj) => from_loose_object(obj),
    }
}

fn from_plain_text(text: &str) -> CanonicalResult {
    let summary = if text.trim().is_empty() {
        None
    } else {
        Some(truncate_for_display(text, SUMMARY_DISPLAY_LIMIT))
    };
    finalize(summary, vec![], vec![], None)
}

/// The payload already uses canonical field names; adopt directly.
fn from_canonical(obj: &Value) -> CanonicalResult {
    let summary = obj["summary"].as_str().map(|s| s.to_string());
    let marker_items = obj["outOfRange"]
        .as_array()
        .or_else(|| obj["markers"].as_array());
    let markers = marker_items
        .map(|items| items.iter().filter_map(marker_from_value).collect())
        .unwrap_or_default();
    let recommendations = recommendation_strings(&obj["recommendations"]);
    finalize(summary, markers, recommendations, None)
}

/// Field-by-field extraction with per-field fallback priority lists.
fn from_loose_object(obj: &Value) -> CanonicalResult {
    let summary = extract_summary(obj);
    let markers = extract_markers(obj);
    let recommendations = extract_recommendations(obj);
    finalize(summary, markers, recommendations, None)
}

// ── Summary ─────────────────────────────────────────────────

fn extract_summary(obj: &Value) -> Option<String> {
    for key in ["summary", "description"] {
        if let Some(s) = non_empty_str(obj.get(key)) {
            return Some(s);
        }
    }
    // `analysis` may be free text, or an object worth showing verbatim.
    match obj.get("analysis") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
        Some(v @ Value::Object(_)) => {
            return Some(serde_json::to_string(v).unwrap_or_default());
        }
        _ => {}
    }
    if let Some(s) = non_empty_str(obj.get("overview")) {
        return Some(s);
    }
    non_empty_str(obj.get("text")).map(|s| truncate_for_display(&s, SUMMARY_DISPLAY_LIMIT))
}

// ── Markers ─────────────────────────────────────────────────

fn extract_markers(obj: &Value) -> Vec<Marker> {
    if let Some(items) = obj["outOfRange"].as_array() {
        return items.iter().filter_map(marker_from_value).collect();
    }
    if let Some(items) = obj["markers"].as_array() {
        return items
            .iter()
            .filter(|item| is_flagged(item))
            .filter_map(marker_from_value)
            .collect();
    }
    if let Some(items) = obj["results"].as_array() {
        return items
            .iter()
            .filter(|item| outside_reference_range(item))
            .filter_map(marker_from_value)
            .collect();
    }
    vec![]
}

/// Build a marker from one item, whatever its field spelling. Items
/// without any recognizable name are dropped; every other sub-field
/// defaults to an explicit placeholder.
fn marker_from_value(item: &Value) -> Option<Marker> {
    let name = field_string(item, &["name", "test_name", "testName", "marker", "parameter"])?;

    let mut marker = Marker::named(name);
    if let Some(value) = field_string(item, &["value", "result", "value_text"]) {
        marker.value = value;
    }
    if let Some(unit) = field_string(item, &["unit", "units"]) {
        marker.unit = unit;
    }
    if let Some(range) = field_string(
        item,
        &["referenceRange", "reference_range", "range", "normal_range"],
    ) {
        marker.reference_range = range;
    } else if let (Some(low), Some(high)) = (
        numeric_field(item, &["reference_range_low", "refLow"]),
        numeric_field(item, &["reference_range_high", "refHigh"]),
    ) {
        marker.reference_range = format!("{low}-{high}");
    }
    if let Some(interpretation) =
        field_string(item, &["interpretation", "flag", "abnormal_flag", "status"])
    {
        marker.interpretation = interpretation;
    }
    Some(marker)
}

/// An item counts as flagged when any status-ish field says so.
fn is_flagged(item: &Value) -> bool {
    for key in ["interpretation", "flag", "abnormal_flag", "status"] {
        if let Some(text) = item.get(key).and_then(Value::as_str) {
            let lowered = text.to_lowercase();
            if ["high", "low", "abnormal", "out of range", "out_of_range", "critical"]
                .iter()
                .any(|needle| lowered.contains(needle))
            {
                return true;
            }
        }
    }
    for key in ["abnormal", "is_abnormal", "isAbnormal", "outOfRange"] {
        if item.get(key).and_then(Value::as_bool) == Some(true) {
            return true;
        }
    }
    false
}

/// Numeric comparison against the item's own reference range.
fn outside_reference_range(item: &Value) -> bool {
    let Some(value) = numeric_field(item, &["value", "result"]) else {
        return false;
    };
    let bounds = field_string(item, &["referenceRange", "reference_range", "range"])
        .and_then(|range| parse_range(&range))
        .or_else(|| {
            match (
                numeric_field(item, &["reference_range_low", "refLow", "low"]),
                numeric_field(item, &["reference_range_high", "refHigh", "high"]),
            ) {
                (Some(low), Some(high)) => Some((low, high)),
                _ => None,
            }
        });
    match bounds {
        Some((low, high)) => value < low || value > high,
        None => false,
    }
}

/// Parse "3.5-5.0" style range strings, tolerating surrounding text.
fn parse_range(range: &str) -> Option<(f64, f64)> {
    let cleaned = range.trim();
    let (low_part, high_part) = cleaned.split_once('-')?;
    let low = low_part.trim().parse::<f64>().ok()?;
    let high = high_part
        .trim()
        .trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.')
        .parse::<f64>()
        .ok()?;
    Some((low, high))
}

// ── Recommendations ─────────────────────────────────────────

fn extract_recommendations(obj: &Value) -> Vec<String> {
    match obj.get("recommendations") {
        Some(v @ Value::Array(_)) => return recommendation_strings(v),
        Some(Value::Object(map)) => {
            // Flatten {"diet": "less sugar"} into "diet: less sugar".
            return map
                .iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{key}: {s}"),
                    other => format!("{key}: {other}"),
                })
                .collect();
        }
        _ => {}
    }
    for key in ["actions", "interventions"] {
        if let Some(v) = obj.get(key) {
            if v.is_array() {
                return recommendation_strings(v);
            }
        }
    }
    vec![]
}

fn recommendation_strings(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Object(_) => field_string(item, &["text", "recommendation", "advice"]),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── Cleanup pass (every path ends here) ─────────────────────

pub(super) fn finalize(
    summary: Option<String>,
    markers: Vec<Marker>,
    recommendations: Vec<String>,
    pages: Option<Vec<PageSummary>>,
) -> CanonicalResult {
    let markers = dedup_markers(markers);
    let recommendations = clean_recommendations(recommendations, !markers.is_empty());
    let summary = match summary {
        Some(s) if !s.trim().is_empty() => truncate_for_display(&s, SUMMARY_DISPLAY_LIMIT),
        _ => CanonicalResult::synthesized_summary(markers.len()),
    };
    CanonicalResult {
        summary,
        markers,
        recommendations,
        pages,
    }
}

/// First occurrence wins; order is preserved.
pub(super) fn dedup_markers(markers: Vec<Marker>) -> Vec<Marker> {
    let mut seen = std::collections::HashSet::new();
    markers
        .into_iter()
        .filter(|m| !m.name.is_empty() && seen.insert(m.name.clone()))
        .collect()
}

/// Drop noise, dedup exact matches, and fall back to context-sensitive
/// default guidance when nothing usable remains.
pub(super) fn clean_recommendations(recommendations: Vec<String>, has_markers: bool) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut cleaned: Vec<String> = recommendations
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| r.chars().count() > MIN_RECOMMENDATION_CHARS)
        .filter(|r| seen.insert(r.clone()))
        .collect();

    if cleaned.is_empty() {
        let fallback = if has_markers {
            DEFAULT_RECOMMENDATION_WITH_MARKERS
        } else {
            DEFAULT_RECOMMENDATION_GENERAL
        };
        cleaned.push(fallback.to_string());
    }
    cleaned
}

// ── Field helpers ───────────────────────────────────────────

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn field_string(item: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match item.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn numeric_field(item: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match item.get(key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(parsed) = s.trim().parse::<f64>() {
                    return Some(parsed);
                }
            }
            _ => {}
        }
    }
    None
}
