//! JSON output format writer.

use crate::error::{Error, Result};
use crate::output::{ClassificationRecord, OutputWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JSON result file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResultFile {
    /// Source image path.
    pub source_file: String,
    /// Analysis timestamp.
    pub analysis_date: DateTime<Utc>,
    /// Model used for classification.
    pub model: String,
    /// Classification settings.
    pub settings: JsonSettings,
    /// Ranked results, best first.
    pub results: Vec<JsonResult>,
}

/// Classification settings for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSettings {
    /// Number of ranked results requested.
    pub top_k: usize,
    /// Minimum probability threshold.
    pub min_confidence: f32,
    /// Model input side length.
    pub input_size: u32,
}

/// Single ranked result in JSON format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResult {
    /// 1-based rank.
    pub rank: usize,
    /// Raw category label.
    pub label: String,
    /// Human-readable label.
    pub display_name: String,
    /// Model score.
    pub probability: f32,
    /// False for the "Not found" sentinel.
    pub found: bool,
}

/// Writer collecting records for one image into a JSON document.
pub struct JsonResultWriter {
    output_path: PathBuf,
    source_file: String,
    model: String,
    settings: JsonSettings,
    results: Vec<JsonResult>,
}

impl JsonResultWriter {
    /// Create a new JSON result writer.
    pub fn new(output_path: &Path, source_file: &Path, model: &str, settings: JsonSettings) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            source_file: source_file.display().to_string(),
            model: model.to_string(),
            settings,
            results: Vec::new(),
        }
    }
}

impl OutputWriter for JsonResultWriter {
    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_record(&mut self, record: &ClassificationRecord) -> Result<()> {
        self.results.push(JsonResult {
            rank: record.rank,
            label: record.label.clone(),
            display_name: record.display_name.clone(),
            probability: record.probability,
            found: record.found,
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let document = JsonResultFile {
            source_file: self.source_file.clone(),
            analysis_date: Utc::now(),
            model: self.model.clone(),
            settings: self.settings.clone(),
            results: std::mem::take(&mut self.results),
        };

        let file = File::create(&self.output_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &document).map_err(|e| Error::JsonWrite {
            path: self.output_path.clone(),
            source: e,
        })?;
        writer.flush()?;
        Ok(())
    }
}
