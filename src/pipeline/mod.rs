//! The document-analysis pipeline: extraction → AI analysis →
//! normalization/aggregation, tracked by the job controller.

pub mod extraction;
pub mod normalize;
pub mod analysis;
