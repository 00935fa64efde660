//! Configuration type definitions.

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_INPUT_SIZE, DEFAULT_MIN_CONFIDENCE, DEFAULT_TOP_K,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configured models by name.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Default settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Inference settings.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Configuration for a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub path: PathBuf,

    /// Path to the labels file.
    pub labels: PathBuf,

    /// Square input side length in pixels.
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    /// Images per forward pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

const fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}

const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Default classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default model name to use.
    pub model: Option<String>,

    /// Number of ranked results to report per image.
    pub top_k: usize,

    /// Minimum probability for a ranked result to be reported.
    pub min_confidence: f32,

    /// Output formats.
    pub formats: Vec<OutputFormat>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: None,
            top_k: DEFAULT_TOP_K,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            formats: vec![OutputFormat::Csv],
        }
    }
}

/// Inference device configuration.
///
/// Accelerators are best effort; an unavailable one falls back to the CPU.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Best available accelerator, else CPU.
    #[default]
    Auto,
    /// Default CPU execution.
    Cpu,
    /// Android Neural Networks API.
    Nnapi,
    /// XNNPACK CPU kernels.
    Xnnpack,
    /// Apple CoreML.
    #[value(name = "coreml")]
    #[serde(rename = "coreml")]
    CoreMl,
    /// NVIDIA CUDA.
    Cuda,
}

impl std::str::FromStr for InferenceDevice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "nnapi" => Ok(Self::Nnapi),
            "xnnpack" => Ok(Self::Xnnpack),
            "coreml" => Ok(Self::CoreMl),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!("unknown inference device: {other}")),
        }
    }
}

/// Inference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device to use for inference.
    pub device: InferenceDevice,

    /// Intra-op thread count (unset = runtime default).
    pub threads: Option<usize>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV table, one row per ranked result.
    Csv,
    /// JSON document per image.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
