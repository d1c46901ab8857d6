pub mod types;
pub mod format;
pub mod sanitize;
pub mod quality;
pub mod pdf;
pub mod extractor;

pub use types::*;
pub use format::*;
pub use sanitize::*;
pub use quality::*;
pub use pdf::*;
pub use extractor::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why extraction failed. Each kind carries exactly one user-facing
/// message — the mapping lives in `user_message`, not at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    PasswordProtected,
    CorruptFile,
    MemoryLimit,
    EmptyFile,
    TooSmall,
    NotADocument,
    Timeout,
    Unknown,
}

impl ExtractionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasswordProtected => "password_protected",
            Self::CorruptFile => "corrupt_file",
            Self::MemoryLimit => "memory_limit",
            Self::EmptyFile => "empty_file",
            Self::TooSmall => "too_small",
            Self::NotADocument => "not_a_document",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "password_protected" => Some(Self::PasswordProtected),
            "corrupt_file" => Some(Self::CorruptFile),
            "memory_limit" => Some(Self::MemoryLimit),
            "empty_file" => Some(Self::EmptyFile),
            "too_small" => Some(Self::TooSmall),
            "not_a_document" => Some(Self::NotADocument),
            "timeout" => Some(Self::Timeout),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// User-facing message for this failure kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PasswordProtected => {
                "This document is password protected. Remove the password and upload it again."
            }
            Self::CorruptFile => {
                "This document could not be read. The file may be damaged or incomplete."
            }
            Self::MemoryLimit => {
                "This document is too large to analyze. Try splitting it into smaller files."
            }
            Self::EmptyFile => "No readable text was found in this document.",
            Self::TooSmall => "This file is too small to be a readable document.",
            Self::NotADocument => {
                "This file has no text layer. Enter the values manually instead."
            }
            Self::Timeout => "Reading this document took too long. Try again with a smaller file.",
            Self::Unknown => "Something went wrong while reading this document.",
        }
    }
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extraction failure: a kind (stable, table-mapped) plus internal detail.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub detail: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Error with the kind's standard user message as detail.
    pub fn of_kind(kind: ExtractionErrorKind) -> Self {
        Self {
            kind,
            detail: kind.user_message().to_string(),
        }
    }
}
