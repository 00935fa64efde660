//! Output type definitions.

use crate::inference::{Classification, display_name};
use std::path::PathBuf;

/// One ranked classification of one image.
#[derive(Debug, Clone)]
pub struct ClassificationRecord {
    /// Path to the source image.
    pub file_path: PathBuf,
    /// 1-based rank within the image's results.
    pub rank: usize,
    /// Raw category label.
    pub label: String,
    /// Human-readable label.
    pub display_name: String,
    /// Model score for the label.
    pub probability: f32,
    /// Whether this row is the "Not found" sentinel.
    pub found: bool,
}

impl ClassificationRecord {
    /// Build a record from a classification result.
    pub fn from_classification(
        classification: &Classification,
        rank: usize,
        file_path: PathBuf,
    ) -> Self {
        Self {
            file_path,
            rank,
            label: classification.label.clone(),
            display_name: display_name(&classification.label),
            probability: classification.probability,
            found: classification.is_found(),
        }
    }
}
