//! Response normalization — the single canonical shape all AI analysis
//! output is converted into.
//!
//! Real model responses use inconsistent field names, string-encoded
//! JSON, nested envelopes, and per-page arrays. Everything here is
//! total: malformed output degrades to default content, it never fails.

pub mod types;
pub mod shape;
pub mod normalizer;
pub mod aggregate;

pub use types::*;
pub use shape::*;
pub use normalizer::*;
pub use aggregate::*;
