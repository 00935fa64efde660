//! Pipeline coordination for file processing.

use crate::config::OutputFormat;
use crate::constants::output_extensions;
use crate::error::{Error, Result};
use crate::imaging::is_image_file;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Options for processing a single image.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Output directory (None = same as input).
    pub output_dir: Option<PathBuf>,
    /// Output formats to generate.
    pub formats: Vec<OutputFormat>,
    /// Force reprocessing even if output exists.
    pub force: bool,
    /// Number of ranked results per image.
    pub top_k: usize,
    /// Minimum probability for a ranked result.
    pub min_confidence: f32,
    /// Model name, recorded in JSON output.
    pub model_name: String,
    /// Print results to stdout instead of writing files.
    pub stdout: bool,
}

/// Result of checking whether a file should be processed.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessCheck {
    /// File should be processed.
    Process,
    /// Skip - output already exists.
    SkipExists,
}

/// Determine the output directory for a file.
pub fn output_dir_for(input: &Path, explicit_output_dir: Option<&Path>) -> PathBuf {
    explicit_output_dir.map_or_else(
        || {
            input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        },
        Path::to_path_buf,
    )
}

/// Get output file path for a given format.
pub fn output_path_for(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    // Lossy so non-UTF-8 names still produce an output file
    let stem = input.file_stem().map_or_else(
        || std::borrow::Cow::Borrowed("output"),
        |s| s.to_string_lossy(),
    );

    let extension = match format {
        OutputFormat::Csv => output_extensions::CSV,
        OutputFormat::Json => output_extensions::JSON,
    };

    output_dir.join(format!("{stem}{extension}"))
}

/// Check if a file should be processed.
pub fn should_process(
    input: &Path,
    output_dir: &Path,
    formats: &[OutputFormat],
    force: bool,
) -> ProcessCheck {
    if !force
        && !formats.is_empty()
        && formats
            .iter()
            .all(|fmt| output_path_for(input, output_dir, *fmt).exists())
    {
        return ProcessCheck::SkipExists;
    }

    ProcessCheck::Process
}

/// Collect image files from paths (files and directories).
///
/// Explicit file arguments are taken as given; directories are scanned
/// recursively for known image extensions. Results are sorted.
///
/// # Errors
/// Returns [`Error::NoValidImageFiles`] if nothing was found.
pub fn collect_input_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if !is_image_file(path) {
                warn!(
                    "{} has no image extension, trying anyway",
                    path.display()
                );
            }
            files.push(path.clone());
        } else if path.is_dir() {
            collect_image_files_recursive(path, &mut files)?;
        } else {
            warn!("Skipping non-existent path: {}", path.display());
        }
    }

    if files.is_empty() {
        return Err(Error::NoValidImageFiles);
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_image_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_image_files_recursive(&path, files)?;
        } else if is_image_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}
