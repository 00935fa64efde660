//! Single image processing pipeline.

use crate::config::OutputFormat;
use crate::constants::confidence::DECIMAL_PLACES;
use crate::error::{Error, Result};
use crate::imaging::{PixelImage, load_image, scale_to_square};
use crate::inference::Classification;
use crate::output::{ClassificationRecord, CsvWriter, JsonResultWriter, JsonSettings, OutputWriter};
use crate::pipeline::service::ClassificationService;
use crate::pipeline::{ProcessOptions, output_path_for};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of processing a single image.
#[derive(Debug)]
pub struct ProcessResult {
    /// Reported results, best first. A single sentinel when nothing qualified.
    pub results: Vec<Classification>,
    /// Processing duration in seconds.
    pub duration_secs: f64,
}

impl ProcessResult {
    /// Best result for the image.
    #[must_use]
    pub fn top(&self) -> Option<&Classification> {
        self.results.first()
    }
}

/// One file queued for batched classification.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Image to classify.
    pub input: PathBuf,
    /// Directory for its result files.
    pub output_dir: PathBuf,
}

/// Classify one image file and write or print its results.
///
/// The image is decoded and scaled here; inference runs on the service's
/// blocking pool. Must be called from outside the service's runtime.
///
/// # Errors
/// Decode errors, classification errors and output write errors.
pub fn process_file(
    input_path: &Path,
    output_dir: &Path,
    service: &ClassificationService,
    options: &ProcessOptions,
) -> Result<ProcessResult> {
    let start_time = Instant::now();
    info!("Processing: {}", input_path.display());

    let input_size = service.classifier().input_size();
    let scaled = prepare_image(input_path, input_size)?;
    let ranked = service
        .submit_ranked(Some(scaled), options.top_k)
        .blocking_wait()?;

    finish_file(input_path, output_dir, ranked, options, input_size, start_time)
}

/// Classify several image files in one forward pass.
///
/// Returns one outcome per item, in order. Files that fail to decode get
/// their own error and stay out of the batch. If the batched call fails,
/// the remaining files are classified one at a time so a single bad input
/// cannot fail its neighbours. Must be called from outside the service's
/// runtime.
pub fn process_batch(
    items: &[BatchItem],
    service: &ClassificationService,
    options: &ProcessOptions,
) -> Vec<Result<ProcessResult>> {
    let start_time = Instant::now();
    let input_size = service.classifier().input_size();

    let mut images = Vec::with_capacity(items.len());
    let prepared: Vec<Result<()>> = items
        .iter()
        .map(|item| {
            info!("Processing: {}", item.input.display());
            prepare_image(&item.input, input_size).map(|image| images.push(image))
        })
        .collect();

    if images.is_empty() {
        return prepared
            .into_iter()
            .map(|p| p.and_then(|()| Err(batch_mismatch())))
            .collect();
    }

    let batch_len = images.len();
    debug!("Classifying batch of {batch_len} image(s)");
    match service
        .submit_ranked_batch(images, options.top_k)
        .blocking_wait()
    {
        Ok(ranked) => {
            let mut ranked = ranked.into_iter();
            prepared
                .into_iter()
                .zip(items)
                .map(|(p, item)| {
                    p.and_then(|()| {
                        let results = ranked.next().ok_or_else(batch_mismatch)?;
                        finish_file(
                            &item.input,
                            &item.output_dir,
                            results,
                            options,
                            input_size,
                            start_time,
                        )
                    })
                })
                .collect()
        }
        Err(e) => {
            warn!("Batch of {batch_len} image(s) failed ({e}); retrying one at a time");
            prepared
                .into_iter()
                .zip(items)
                .map(|(p, item)| {
                    p.and_then(|()| process_file(&item.input, &item.output_dir, service, options))
                })
                .collect()
        }
    }
}

fn batch_mismatch() -> Error {
    Error::Internal {
        message: "batch returned fewer results than images".to_string(),
    }
}

/// Decode an image file and scale it to the model input.
fn prepare_image(input_path: &Path, input_size: u32) -> Result<PixelImage> {
    let decoded = load_image(input_path)?;
    debug!(
        "Decoded {}x{} image, scaling to {input_size}x{input_size}",
        decoded.width(),
        decoded.height()
    );
    Ok(scale_to_square(&decoded, input_size))
}

/// Filter ranked results and write or print them.
fn finish_file(
    input_path: &Path,
    output_dir: &Path,
    ranked: Vec<Classification>,
    options: &ProcessOptions,
    input_size: u32,
    start_time: Instant,
) -> Result<ProcessResult> {
    let results = filter_results(ranked, options.min_confidence);

    if options.stdout {
        print_results(input_path, &results);
    } else {
        for format in &options.formats {
            write_output(input_path, output_dir, *format, &results, options, input_size)?;
        }
    }

    let duration_secs = start_time.elapsed().as_secs_f64();
    if let Some(best) = results.first() {
        info!(
            "{}: {} ({:.1}%) in {:.2}s",
            input_path.display(),
            best.label,
            best.probability * 100.0,
            duration_secs
        );
    }

    Ok(ProcessResult {
        results,
        duration_secs,
    })
}

/// Drop found results below `min_confidence`, keeping at least the sentinel.
fn filter_results(ranked: Vec<Classification>, min_confidence: f32) -> Vec<Classification> {
    let kept: Vec<_> = ranked
        .into_iter()
        .filter(|c| c.is_found() && c.probability >= min_confidence)
        .collect();

    if kept.is_empty() {
        vec![Classification::not_found()]
    } else {
        kept
    }
}

/// One line per image: path, best label, probability.
#[allow(clippy::print_stdout)]
fn print_results(input_path: &Path, results: &[Classification]) {
    if let Some(best) = results.first() {
        println!(
            "{}\t{}\t{:.prec$}",
            input_path.display(),
            best.label,
            best.probability,
            prec = DECIMAL_PLACES
        );
    }
}

/// Write results to an output file.
fn write_output(
    input_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
    results: &[Classification],
    options: &ProcessOptions,
    input_size: u32,
) -> Result<()> {
    let output_path = output_path_for(input_path, output_dir, format);
    debug!("Writing {} output: {}", format, output_path.display());

    let mut writer: Box<dyn OutputWriter> = match format {
        OutputFormat::Csv => Box::new(CsvWriter::new(&output_path)?),
        OutputFormat::Json => Box::new(JsonResultWriter::new(
            &output_path,
            input_path,
            &options.model_name,
            JsonSettings {
                top_k: options.top_k,
                min_confidence: options.min_confidence,
                input_size,
            },
        )),
    };

    writer.write_header()?;
    for (i, result) in results.iter().enumerate() {
        let record = ClassificationRecord::from_classification(result, i + 1, input_path.to_path_buf());
        writer.write_record(&record)?;
    }
    writer.finalize()?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::constants::sentinel;
    use crate::inference::{BirdClassifier, CategoryList, InferenceEngine, InputTensor};
    use crate::output::JsonResultFile;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScoresEngine(Vec<f32>);

    impl InferenceEngine for ScoresEngine {
        fn run(&self, _input: &InputTensor) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn provider(&self) -> &str {
            "scores"
        }
    }

    /// Repeats its scores once per image and counts forward passes.
    struct BatchEngine {
        scores: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl InferenceEngine for BatchEngine {
        fn run(&self, input: &InputTensor) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.repeat(input.batch_size()))
        }

        fn provider(&self) -> &str {
            "batch"
        }
    }

    fn found(label: &str, probability: f32, index: usize) -> Classification {
        Classification {
            label: label.to_string(),
            probability,
            index: Some(index),
        }
    }

    fn options(formats: Vec<OutputFormat>, min_confidence: f32) -> ProcessOptions {
        ProcessOptions {
            output_dir: None,
            formats,
            force: false,
            top_k: 2,
            min_confidence,
            model_name: "garden".to_string(),
            stdout: false,
        }
    }

    fn write_png(dir: &Path) -> PathBuf {
        write_named_png(dir, "feeder.png")
    }

    fn write_named_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(40, 30, image::Rgb([200, 120, 40]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_filter_results_threshold() {
        let ranked = vec![found("robin", 0.6, 0), found("wren", 0.3, 1)];
        let kept = filter_results(ranked, 0.5);
        assert_eq!(kept, vec![found("robin", 0.6, 0)]);
    }

    #[test]
    fn test_filter_results_falls_back_to_sentinel() {
        let kept = filter_results(vec![found("robin", 0.1, 0)], 0.5);
        assert_eq!(kept, vec![Classification::not_found()]);

        let kept = filter_results(vec![Classification::not_found()], 0.0);
        assert_eq!(kept, vec![Classification::not_found()]);
    }

    #[test]
    fn test_process_file_writes_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path());

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let classifier = BirdClassifier::with_engine(
            Box::new(ScoresEngine(vec![0.1, 0.6, 0.3])),
            CategoryList::new(["house_sparrow", "great_tit", "blue_tit"]),
            8,
        );
        let service = ClassificationService::new(Arc::new(classifier), runtime.handle().clone());
        let opts = options(vec![OutputFormat::Csv, OutputFormat::Json], 0.0);

        let result = process_file(&input, dir.path(), &service, &opts).unwrap();
        assert_eq!(result.top().unwrap().label, "great_tit");
        assert_eq!(result.results.len(), 2);

        let csv = std::fs::read_to_string(dir.path().join("feeder.birdeye.csv")).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("great_tit,Great Tit,0.6000"));
        assert!(lines[2].contains("blue_tit,Blue Tit,0.3000"));

        let json: JsonResultFile = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("feeder.birdeye.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json.settings.input_size, 8);
        assert_eq!(json.results[0].label, "great_tit");
    }

    #[test]
    fn test_process_file_unavailable_model_writes_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path());

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let classifier = BirdClassifier::unavailable(CategoryList::default(), 8);
        let service = ClassificationService::new(Arc::new(classifier), runtime.handle().clone());

        let result =
            process_file(&input, dir.path(), &service, &options(vec![OutputFormat::Csv], 0.0))
                .unwrap();
        assert_eq!(result.results, vec![Classification::not_found()]);

        let csv = std::fs::read_to_string(dir.path().join("feeder.birdeye.csv")).unwrap();
        assert!(csv.contains(sentinel::NOT_FOUND_LABEL));
    }

    #[test]
    fn test_process_file_undecodable_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.jpg");
        std::fs::write(&input, b"not an image").unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let classifier = BirdClassifier::unavailable(CategoryList::default(), 8);
        let service = ClassificationService::new(Arc::new(classifier), runtime.handle().clone());

        let result = process_file(&input, dir.path(), &service, &options(vec![OutputFormat::Csv], 0.0));
        assert!(result.is_err());
        assert!(!dir.path().join("broken.birdeye.csv").exists());
    }

    #[test]
    fn test_process_batch_one_forward_pass_for_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<BatchItem> = ["a.png", "b.png", "c.png"]
            .iter()
            .map(|name| BatchItem {
                input: write_named_png(dir.path(), name),
                output_dir: dir.path().to_path_buf(),
            })
            .collect();

        let calls = Arc::new(AtomicUsize::new(0));
        let engine = BatchEngine {
            scores: vec![0.2, 0.1, 0.7],
            calls: Arc::clone(&calls),
        };
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let classifier = BirdClassifier::with_engine(
            Box::new(engine),
            CategoryList::new(["house_sparrow", "great_tit", "blue_tit"]),
            8,
        );
        let service = ClassificationService::new(Arc::new(classifier), runtime.handle().clone());

        let outcomes = process_batch(&items, &service, &options(vec![OutputFormat::Csv], 0.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert_eq!(outcome.as_ref().unwrap().top().unwrap().label, "blue_tit");
        }
        for stem in ["a", "b", "c"] {
            assert!(dir.path().join(format!("{stem}.birdeye.csv")).exists());
        }
    }

    #[test]
    fn test_process_batch_isolates_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();
        let items = vec![
            BatchItem {
                input: write_named_png(dir.path(), "first.png"),
                output_dir: dir.path().to_path_buf(),
            },
            BatchItem {
                input: broken,
                output_dir: dir.path().to_path_buf(),
            },
            BatchItem {
                input: write_named_png(dir.path(), "last.png"),
                output_dir: dir.path().to_path_buf(),
            },
        ];

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let classifier = BirdClassifier::with_engine(
            Box::new(BatchEngine {
                scores: vec![0.9, 0.1],
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            CategoryList::new(["robin", "wren"]),
            8,
        );
        let service = ClassificationService::new(Arc::new(classifier), runtime.handle().clone());

        let outcomes = process_batch(&items, &service, &options(vec![OutputFormat::Csv], 0.0));
        assert_eq!(outcomes[0].as_ref().unwrap().top().unwrap().label, "robin");
        assert!(outcomes[1].is_err());
        assert_eq!(outcomes[2].as_ref().unwrap().top().unwrap().label, "robin");
        assert!(!dir.path().join("broken.birdeye.csv").exists());
    }
}
