//! Model and category loading.

use crate::config::InferenceDevice;
use crate::error::Result;
use crate::inference::engine::{InferenceEngine, ModelAsset, OrtEngine};
use crate::inference::labels::{CategoryList, load_categories};
use std::path::Path;
use tracing::info;

/// Options applied when building the inference engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Requested accelerator. Falls back to CPU if unavailable.
    pub device: InferenceDevice,
    /// Intra-op thread count (None = runtime default).
    pub threads: Option<usize>,
}

/// Load the category list and the model.
///
/// Categories are read first; the model file is then mapped read-only and
/// handed to the runtime.
///
/// # Errors
/// Returns a load error if either asset is missing or the model is rejected.
pub fn load(
    model_path: &Path,
    labels_path: &Path,
    options: &LoadOptions,
) -> Result<(Box<dyn InferenceEngine>, CategoryList)> {
    let categories = load_categories(labels_path)?;
    info!(
        "Loaded {} categories from {}",
        categories.len(),
        labels_path.display()
    );

    let asset = ModelAsset::open(model_path)?;
    let engine = OrtEngine::from_asset(asset, options.device, options.threads)?;

    Ok((Box::new(engine), categories))
}
