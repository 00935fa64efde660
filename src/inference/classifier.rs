//! Classifier invoker: runs the model and reduces its scores to a label.

use crate::constants::sentinel;
use crate::error::{Error, Result};
use crate::imaging::PixelImage;
use crate::inference::engine::InferenceEngine;
use crate::inference::labels::CategoryList;
use crate::inference::loader::{LoadOptions, load};
use crate::inference::preprocess::{InputTensor, build_batch_tensor, build_input_tensor};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// A single classification outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Category label, or the "Not found" sentinel.
    pub label: String,
    /// Score of the selected category (used for ranking only).
    pub probability: f32,
    /// Output slot of the category; `None` for the sentinel.
    pub index: Option<usize>,
}

impl Classification {
    /// The "no classification available" result.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            label: sentinel::NOT_FOUND_LABEL.to_string(),
            probability: sentinel::PROBABILITY,
            index: None,
        }
    }

    /// Whether a real category was selected.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.index.is_some()
    }
}

/// Reduce a score vector to the best category.
///
/// Single left-to-right scan; the running maximum starts below any real
/// score and only moves on a strictly greater value, so ties keep the
/// earliest index. Scores past the end of `categories` are ignored.
#[must_use]
pub fn reduce(probabilities: &[f32], categories: &CategoryList) -> Classification {
    let mut max_index: Option<usize> = None;
    let mut max_value = sentinel::INITIAL_MAX;

    for (i, &probability) in probabilities.iter().take(categories.len()).enumerate() {
        debug!(
            "Category: {i} prob: {probability}, label: {}",
            categories.get(i).unwrap_or_default()
        );
        if probability > max_value {
            max_index = Some(i);
            max_value = probability;
        }
    }

    let Some(index) = max_index else {
        return Classification::not_found();
    };

    let label = categories
        .get(index)
        .map_or_else(|| sentinel::NOT_FOUND_LABEL.to_string(), str::to_string);
    let probability = if max_value > sentinel::INITIAL_MAX {
        max_value
    } else {
        sentinel::PROBABILITY
    };

    debug!("Identified: {label} ({probability:.4})");

    Classification {
        label,
        probability,
        index: Some(index),
    }
}

/// The `k` highest-scoring categories, best first.
///
/// Equal scores keep their output-slot order. NaN scores are never ranked.
#[must_use]
pub fn rank(probabilities: &[f32], categories: &CategoryList, k: usize) -> Vec<Classification> {
    let mut indexed: Vec<(usize, f32)> = probabilities
        .iter()
        .take(categories.len())
        .copied()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .collect();

    // Stable sort: ties stay in slot order. `-0.0 == 0.0` counts as a tie,
    // matching `reduce`.
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    indexed
        .into_iter()
        .take(k)
        .filter_map(|(i, probability)| {
            categories.get(i).map(|label| Classification {
                label: label.to_string(),
                probability,
                index: Some(i),
            })
        })
        .collect()
}

/// Bird species classifier with a shared, read-only model and category list.
///
/// If the model fails to load the classifier stays usable but unavailable:
/// every classification returns [`Classification::not_found`].
pub struct BirdClassifier {
    engine: Option<Box<dyn InferenceEngine>>,
    categories: CategoryList,
    input_size: u32,
    load_error: Option<String>,
}

impl BirdClassifier {
    /// Load model and categories, degrading to an unavailable classifier on
    /// failure. The error is logged and kept in [`Self::load_error`].
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        input_size: u32,
        options: &LoadOptions,
    ) -> Self {
        match Self::try_load(model_path, labels_path, input_size, options) {
            Ok(classifier) => classifier,
            Err(e) => {
                error!("Classifier unavailable: {e}");
                Self {
                    engine: None,
                    categories: CategoryList::default(),
                    input_size,
                    load_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Load model and categories, returning the error on failure.
    ///
    /// # Errors
    /// Returns a load error if either asset is missing or invalid.
    pub fn try_load(
        model_path: &Path,
        labels_path: &Path,
        input_size: u32,
        options: &LoadOptions,
    ) -> Result<Self> {
        let (engine, categories) = load(model_path, labels_path, options)?;
        if categories.is_empty() {
            warn!(
                "Labels file {} has no categories; every result will be '{}'",
                labels_path.display(),
                sentinel::NOT_FOUND_LABEL
            );
        }
        Ok(Self::with_engine(engine, categories, input_size))
    }

    /// Build a classifier around an already constructed engine.
    #[must_use]
    pub fn with_engine(
        engine: Box<dyn InferenceEngine>,
        categories: CategoryList,
        input_size: u32,
    ) -> Self {
        Self {
            engine: Some(engine),
            categories,
            input_size,
            load_error: None,
        }
    }

    /// Classifier with no model, e.g. for hosts that load later.
    #[must_use]
    pub fn unavailable(categories: CategoryList, input_size: u32) -> Self {
        Self {
            engine: None,
            categories,
            input_size,
            load_error: None,
        }
    }

    /// Retry loading. On success the engine and categories are replaced; on
    /// failure the current state is kept and the error returned.
    ///
    /// # Errors
    /// Returns the load error.
    pub fn reload(
        &mut self,
        model_path: &Path,
        labels_path: &Path,
        options: &LoadOptions,
    ) -> Result<()> {
        match load(model_path, labels_path, options) {
            Ok((engine, categories)) => {
                info!("Classifier reloaded with {} categories", categories.len());
                self.engine = Some(engine);
                self.categories = categories;
                self.load_error = None;
                Ok(())
            }
            Err(e) => {
                error!("Reload failed: {e}");
                self.load_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Whether a model is loaded.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Message of the last load failure, if any.
    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Ordered category list.
    #[must_use]
    pub fn categories(&self) -> &CategoryList {
        &self.categories
    }

    /// Square input side the model expects.
    #[must_use]
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Execution provider of the loaded engine.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.engine.as_deref().map(|engine| engine.provider())
    }

    /// Classify a prepared single-image tensor.
    ///
    /// # Errors
    /// Returns [`Error::Inference`] if the engine fails or produces too few
    /// scores. Without a model, returns the sentinel instead.
    pub fn classify_tensor(&self, tensor: &InputTensor) -> Result<Classification> {
        let rows = self.run_rows(tensor)?;
        Ok(match rows.first() {
            Some(row) => reduce(row, &self.categories),
            None => Classification::not_found(),
        })
    }

    /// Classify a batched tensor, one result per image.
    ///
    /// # Errors
    /// Same as [`Self::classify_tensor`].
    pub fn classify_batch_tensor(&self, tensor: &InputTensor) -> Result<Vec<Classification>> {
        let rows = self.run_rows(tensor)?;
        if rows.is_empty() {
            return Ok(vec![Classification::not_found(); tensor.batch_size()]);
        }
        Ok(rows
            .iter()
            .map(|row| reduce(row, &self.categories))
            .collect())
    }

    /// Preprocess and classify an image already scaled to the input size.
    ///
    /// # Errors
    /// Input errors from preprocessing, inference errors from the engine.
    pub fn classify_image(&self, image: Option<&PixelImage>) -> Result<Classification> {
        let tensor = build_input_tensor(image, self.input_size)?;
        self.classify_tensor(&tensor)
    }

    /// Preprocess and classify several images in one forward pass.
    ///
    /// # Errors
    /// Same as [`Self::classify_image`].
    pub fn classify_images(&self, images: &[PixelImage]) -> Result<Vec<Classification>> {
        let tensor = build_batch_tensor(images, self.input_size)?;
        self.classify_batch_tensor(&tensor)
    }

    /// Top-`k` categories for an image, best first.
    ///
    /// Without a model the result is a single sentinel entry.
    ///
    /// # Errors
    /// Same as [`Self::classify_image`].
    pub fn classify_ranked(
        &self,
        image: Option<&PixelImage>,
        k: usize,
    ) -> Result<Vec<Classification>> {
        let tensor = build_input_tensor(image, self.input_size)?;
        let rows = self.run_rows(&tensor)?;
        Ok(rows.first().map_or_else(
            || vec![Classification::not_found()],
            |row| self.ranked_row(row, k),
        ))
    }

    /// Top-`k` categories for several images in one forward pass, one
    /// ranked list per image in input order.
    ///
    /// # Errors
    /// Same as [`Self::classify_images`].
    pub fn classify_ranked_batch(
        &self,
        images: &[PixelImage],
        k: usize,
    ) -> Result<Vec<Vec<Classification>>> {
        let tensor = build_batch_tensor(images, self.input_size)?;
        let rows = self.run_rows(&tensor)?;
        if rows.is_empty() {
            return Ok(vec![vec![Classification::not_found()]; images.len()]);
        }
        Ok(rows.iter().map(|row| self.ranked_row(row, k)).collect())
    }

    fn ranked_row(&self, row: &[f32], k: usize) -> Vec<Classification> {
        let ranked = rank(row, &self.categories, k);
        if ranked.is_empty() {
            vec![Classification::not_found()]
        } else {
            ranked
        }
    }

    /// Run the engine and split its output into one row per image.
    ///
    /// Returns no rows when no model is loaded.
    fn run_rows(&self, tensor: &InputTensor) -> Result<Vec<Vec<f32>>> {
        let Some(engine) = self.engine.as_deref() else {
            debug!("No model loaded, skipping inference");
            return Ok(Vec::new());
        };

        let batch = tensor.batch_size().max(1);
        let scores = engine.run(tensor)?;

        let per_row = scores.len() / batch;
        if per_row < self.categories.len() || scores.len() % batch != 0 {
            return Err(Error::Inference {
                reason: format!(
                    "model produced {} scores for {batch} image(s), expected {} per image",
                    scores.len(),
                    self.categories.len()
                ),
            });
        }
        if per_row > self.categories.len() {
            warn!(
                "Model produced {per_row} scores per image but only {} categories are known",
                self.categories.len()
            );
        }

        Ok(scores.chunks(per_row.max(1)).map(<[f32]>::to_vec).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Engine returning fixed scores and counting invocations.
    struct FixedEngine {
        scores: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedEngine {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl InferenceEngine for FixedEngine {
        fn run(&self, input: &InputTensor) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .scores
                .iter()
                .copied()
                .cycle()
                .take(self.scores.len() * input.batch_size())
                .collect())
        }

        fn provider(&self) -> &str {
            "fixed"
        }
    }

    /// Engine that checks the input length like a real runtime would.
    struct ShapeCheckingEngine {
        expected_len: usize,
    }

    impl InferenceEngine for ShapeCheckingEngine {
        fn run(&self, input: &InputTensor) -> Result<Vec<f32>> {
            if input.data().len() != self.expected_len {
                return Err(Error::Inference {
                    reason: format!(
                        "got {} input values, expected {}",
                        input.data().len(),
                        self.expected_len
                    ),
                });
            }
            Ok(vec![0.5, 0.5])
        }

        fn provider(&self) -> &str {
            "shape-checking"
        }
    }

    fn birds() -> CategoryList {
        CategoryList::new(["robin", "wren", "barn_owl", "blue_tit"])
    }

    #[test]
    fn test_reduce_first_maximum_wins() {
        let result = reduce(&[0.1, 0.9, 0.9, 0.2], &birds());
        assert_eq!(result.index, Some(1));
        assert_eq!(result.label, "wren");
        assert_eq!(result.probability, 0.9);
    }

    #[test]
    fn test_reduce_empty_categories_is_sentinel() {
        let result = reduce(&[0.3, 0.7], &CategoryList::default());
        assert_eq!(result, Classification::not_found());
        assert!(!result.is_found());
    }

    #[test]
    fn test_reduce_empty_scores_is_sentinel() {
        assert_eq!(reduce(&[], &birds()), Classification::not_found());
    }

    #[test]
    fn test_reduce_zero_scores_select_first() {
        let result = reduce(&[0.0, 0.0, 0.0, 0.0], &birds());
        assert_eq!(result.index, Some(0));
        assert_eq!(result.probability, 0.0);
    }

    #[test]
    fn test_reduce_ignores_scores_below_sentinel() {
        let result = reduce(&[-5.0, -2.0], &CategoryList::new(["a", "b"]));
        assert_eq!(result, Classification::not_found());
    }

    #[test]
    fn test_category_order_defines_label() {
        let scores = [0.05, 0.1, 0.8, 0.05];
        let forward = reduce(&scores, &birds());
        let reversed = reduce(
            &scores,
            &CategoryList::new(["blue_tit", "barn_owl", "wren", "robin"]),
        );
        assert_eq!(forward.label, "barn_owl");
        assert_eq!(reversed.label, "wren");
        assert_eq!(forward.index, reversed.index);
        assert_eq!(forward.probability, reversed.probability);
    }

    #[test]
    fn test_rank_orders_and_keeps_ties_stable() {
        let ranked = rank(&[0.1, 0.9, 0.9, 0.2], &birds(), 3);
        let labels: Vec<&str> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["wren", "barn_owl", "blue_tit"]);
    }

    #[test]
    fn test_rank_treats_signed_zeros_as_tie() {
        let categories = CategoryList::new(["a", "b"]);
        let scores = [-0.0, 0.0];
        let ranked = rank(&scores, &categories, 2);
        assert_eq!(ranked[0].index, reduce(&scores, &categories).index);
        assert_eq!(ranked[0].index, Some(0));
    }

    #[test]
    fn test_classify_ranked_top_matches_reduce_on_signed_zero_tie() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![-0.0, 0.0])),
            CategoryList::new(["a", "b"]),
            2,
        );
        let image = PixelImage::filled(2, 2, 0);
        let ranked = classifier.classify_ranked(Some(&image), 2).unwrap();
        let best = reduce(&[-0.0, 0.0], classifier.categories());
        assert_eq!(ranked[0].index, best.index);
        assert_eq!(ranked[0].label, "a");
    }

    #[test]
    fn test_rank_skips_nan() {
        let ranked = rank(&[f32::NAN, 0.2], &CategoryList::new(["a", "b"]), 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label, "b");
    }

    #[test]
    fn test_unavailable_classifier_returns_sentinel() {
        let classifier = BirdClassifier::load(
            Path::new("/nonexistent/model.onnx"),
            Path::new("/nonexistent/labels.txt"),
            8,
            &LoadOptions::default(),
        );
        assert!(!classifier.is_available());
        assert!(classifier.load_error().is_some());

        let image = PixelImage::filled(8, 8, 0xFF33_6699);
        let result = classifier.classify_image(Some(&image)).unwrap();
        assert_eq!(result, Classification::not_found());

        let ranked = classifier.classify_ranked(Some(&image), 3).unwrap();
        assert_eq!(ranked, vec![Classification::not_found()]);
    }

    #[test]
    fn test_try_load_reports_error() {
        let result = BirdClassifier::try_load(
            Path::new("/nonexistent/model.onnx"),
            Path::new("/nonexistent/labels.txt"),
            224,
            &LoadOptions::default(),
        );
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Load));
    }

    #[test]
    fn test_reload_failure_keeps_state() {
        let mut classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![0.1, 0.2, 0.3, 0.4])),
            birds(),
            4,
        );
        let result = classifier.reload(
            Path::new("/nonexistent/model.onnx"),
            Path::new("/nonexistent/labels.txt"),
            &LoadOptions::default(),
        );
        assert!(result.is_err());
        assert!(classifier.is_available());
        assert_eq!(classifier.categories().len(), 4);
        assert!(classifier.load_error().is_some());
    }

    #[test]
    fn test_classify_image_with_engine() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![0.1, 0.2, 0.6, 0.1])),
            birds(),
            4,
        );
        assert_eq!(classifier.provider(), Some("fixed"));

        let image = PixelImage::filled(4, 4, 0xFFFF_FFFF);
        let result = classifier.classify_image(Some(&image)).unwrap();
        assert_eq!(result.label, "barn_owl");
        assert_eq!(result.probability, 0.6);
    }

    #[test]
    fn test_unavailable_skips_engine() {
        let classifier = BirdClassifier::unavailable(birds(), 4);
        let tensor = InputTensor::from_raw(vec![0.0; 48], 1, 4);
        assert_eq!(
            classifier.classify_tensor(&tensor).unwrap(),
            Classification::not_found()
        );
    }

    #[test]
    fn test_engine_invoked_once_per_classification() {
        let engine = FixedEngine::new(vec![0.4, 0.3, 0.2, 0.1]);
        let calls = Arc::clone(&engine.calls);
        let classifier = BirdClassifier::with_engine(Box::new(engine), birds(), 2);

        let image = PixelImage::filled(2, 2, 0);
        classifier.classify_image(Some(&image)).unwrap();
        classifier.classify_image(Some(&image)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_image_is_input_error() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![1.0; 4])),
            birds(),
            4,
        );
        let err = classifier.classify_image(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_malformed_tensor_error_propagates() {
        let classifier = BirdClassifier::with_engine(
            Box::new(ShapeCheckingEngine { expected_len: 12 }),
            CategoryList::new(["a", "b"]),
            2,
        );
        let bad = InputTensor::from_raw(vec![0.0; 5], 1, 2);
        let err = classifier.classify_tensor(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inference);
    }

    #[test]
    fn test_short_output_is_inference_error() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![0.5, 0.5])),
            birds(),
            2,
        );
        let image = PixelImage::filled(2, 2, 0);
        let err = classifier.classify_image(Some(&image)).unwrap_err();
        assert!(matches!(err, Error::Inference { .. }));
    }

    #[test]
    fn test_empty_categories_with_engine_is_sentinel() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![0.5, 0.9])),
            CategoryList::default(),
            2,
        );
        let image = PixelImage::filled(2, 2, 0);
        let result = classifier.classify_image(Some(&image)).unwrap();
        assert_eq!(result, Classification::not_found());
    }

    #[test]
    fn test_classify_images_one_result_per_image() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![0.1, 0.7, 0.1, 0.1])),
            birds(),
            2,
        );
        let images = vec![PixelImage::filled(2, 2, 0); 3];
        let results = classifier.classify_images(&images).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.label == "wren"));
    }

    #[test]
    fn test_classify_ranked_batch_one_list_per_image() {
        let engine = FixedEngine::new(vec![0.1, 0.2, 0.6, 0.1]);
        let calls = Arc::clone(&engine.calls);
        let classifier = BirdClassifier::with_engine(Box::new(engine), birds(), 2);

        let images = vec![PixelImage::filled(2, 2, 0); 3];
        let ranked = classifier.classify_ranked_batch(&images, 2).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ranked.len(), 3);
        for list in &ranked {
            let labels: Vec<&str> = list.iter().map(|c| c.label.as_str()).collect();
            assert_eq!(labels, ["barn_owl", "wren"]);
        }
    }

    #[test]
    fn test_classify_ranked_batch_unavailable_is_sentinel_per_image() {
        let classifier = BirdClassifier::unavailable(birds(), 2);
        let images = vec![PixelImage::filled(2, 2, 0); 2];
        let ranked = classifier.classify_ranked_batch(&images, 3).unwrap();
        assert_eq!(ranked, vec![vec![Classification::not_found()]; 2]);
    }

    #[test]
    fn test_classify_ranked_top_k() {
        let classifier = BirdClassifier::with_engine(
            Box::new(FixedEngine::new(vec![0.1, 0.2, 0.6, 0.1])),
            birds(),
            2,
        );
        let image = PixelImage::filled(2, 2, 0);
        let ranked = classifier.classify_ranked(Some(&image), 2).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, "barn_owl");
        assert_eq!(ranked[1].label, "wren");
    }
}
