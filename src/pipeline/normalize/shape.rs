//! Shape detection for raw AI output.
//!
//! Consumers never probe ad hoc property names: the envelope priority
//! list and the shape union below are the one place response layout
//! knowledge lives.

use serde_json::Value;

/// One envelope the model may wrap its payload in.
pub struct EnvelopeRule {
    /// Key path from the root, e.g. `["data", "analyzed_data"]`.
    pub path: &'static [&'static str],
    /// Only unwrap when the value is an object (`analysis` is sometimes
    /// a free-text string that belongs in the summary instead).
    pub objects_only: bool,
}

/// Priority-ordered envelope detection table. First present wins;
/// when none match the root itself is the payload.
pub const ENVELOPE_RULES: &[EnvelopeRule] = &[
    EnvelopeRule { path: &["lab_results"], objects_only: false },
    EnvelopeRule { path: &["data", "analyzed_data"], objects_only: false },
    EnvelopeRule { path: &["data"], objects_only: false },
    EnvelopeRule { path: &["analysis"], objects_only: true },
    EnvelopeRule { path: &["analyzed_data"], objects_only: false },
];

/// Unwrap the first matching envelope, or return the root unchanged.
pub fn unwrap_envelope(root: &Value) -> &Value {
    for rule in ENVELOPE_RULES {
        let Some(candidate) = lookup(root, rule.path) else {
            continue;
        };
        if candidate.is_null() {
            continue;
        }
        if rule.objects_only && !candidate.is_object() {
            continue;
        }
        return candidate;
    }
    root
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// The known response layouts, plus an explicit unknown variant.
#[derive(Debug, PartialEq)]
pub enum ResponseShape<'a> {
    /// Nothing usable — null or absent payload.
    Null,
    /// Free text that is not JSON (or a string-valued envelope).
    PlainText(&'a str),
    /// Array of per-page partial results.
    PageArray(&'a [Value]),
    /// Already carries `summary` + marker array + `recommendations`.
    Canonical(&'a Value),
    /// An object needing field-by-field fallback extraction.
    LooseObject(&'a Value),
    /// A scalar or otherwise unusable payload.
    Unknown,
}

/// Classify an (already unwrapped) payload.
pub fn classify(payload: &Value) -> ResponseShape<'_> {
    match payload {
        Value::Null => ResponseShape::Null,
        Value::String(s) => ResponseShape::PlainText(s),
        Value::Array(items) => ResponseShape::PageArray(items),
        Value::Object(_) if has_canonical_fields(payload) => ResponseShape::Canonical(payload),
        Value::Object(_) => ResponseShape::LooseObject(payload),
        _ => ResponseShape::Unknown,
    }
}

/// True when all three canonical fields are present with usable types.
fn has_canonical_fields(payload: &Value) -> bool {
    let has_summary = payload["summary"].is_string();
    let has_markers = payload["outOfRange"].is_array() || payload["markers"].is_array();
    let has_recommendations = payload["recommendations"].is_array();
    has_summary && has_markers && has_recommendations
}
