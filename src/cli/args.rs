//! CLI argument definitions.

use crate::cli::validators::{parse_confidence, parse_positive};
use crate::config::{InferenceDevice, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bird species recognition for still images.
#[derive(Debug, Parser)]
#[command(name = "birdeye")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Image files or directories to classify.
    pub inputs: Vec<PathBuf>,

    /// Common options for classification.
    #[command(flatten)]
    pub classify: ClassifyArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage models.
    Models {
        /// Models action to perform.
        #[command(subcommand)]
        action: ModelsAction,
    },
    /// List the species a model recognizes, sorted by name.
    Species {
        /// Model name from configuration (default: configured default).
        #[arg(short, long)]
        model: Option<String>,
        /// Labels file to read instead of a configured model's.
        #[arg(long, conflicts_with = "model")]
        labels: Option<PathBuf>,
        /// Write the list to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List execution providers and whether they are usable.
    Providers,
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Models subcommand actions.
#[derive(Debug, Subcommand)]
pub enum ModelsAction {
    /// List configured models.
    List,
    /// Add a new model to configuration.
    Add {
        /// Name for this model (e.g., "garden-birds").
        name: String,
        /// Path to the ONNX model file.
        #[arg(long)]
        path: PathBuf,
        /// Path to the labels file.
        #[arg(long)]
        labels: PathBuf,
        /// Square input side length in pixels.
        #[arg(long, value_parser = parse_positive)]
        input_size: Option<u32>,
        /// Set as the default model.
        #[arg(long)]
        default: bool,
    },
    /// Verify model files exist.
    Check,
}

/// Arguments for classification.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct ClassifyArgs {
    /// Model name from configuration.
    #[arg(short, long, env = "BIRDEYE_MODEL")]
    pub model: Option<String>,

    /// Path to ONNX model file (overrides config).
    #[arg(long, env = "BIRDEYE_MODEL_PATH", requires = "labels_path")]
    pub model_path: Option<PathBuf>,

    /// Path to labels file (overrides config).
    #[arg(long, env = "BIRDEYE_LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Square model input side in pixels (overrides config).
    #[arg(long, value_parser = parse_positive, env = "BIRDEYE_INPUT_SIZE")]
    pub input_size: Option<u32>,

    /// Images per forward pass (overrides config).
    #[arg(short, long, value_parser = parse_positive, env = "BIRDEYE_BATCH_SIZE")]
    pub batch_size: Option<u32>,

    /// Number of ranked results per image.
    #[arg(short = 'k', long, value_parser = parse_positive, env = "BIRDEYE_TOP_K")]
    pub top_k: Option<u32>,

    /// Minimum probability for a ranked result (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "BIRDEYE_MIN_CONFIDENCE")]
    pub min_confidence: Option<f32>,

    /// Output formats (comma-separated: csv,json).
    #[arg(short, long, value_delimiter = ',', env = "BIRDEYE_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Output directory (default: same as input).
    #[arg(short, long, env = "BIRDEYE_OUTPUT_DIR", conflicts_with = "stdout")]
    pub output_dir: Option<PathBuf>,

    /// Print the best result per image to stdout instead of writing files.
    #[arg(long)]
    pub stdout: bool,

    /// Reprocess files even if output exists.
    #[arg(long)]
    pub force: bool,

    /// Stop on first error.
    #[arg(long)]
    pub fail_fast: bool,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "device")]
    pub cpu: bool,

    /// Inference device (auto, cpu, nnapi, xnnpack, coreml, cuda).
    #[arg(long, value_enum, env = "BIRDEYE_DEVICE")]
    pub device: Option<InferenceDevice>,
}

impl ClassifyArgs {
    /// Device requested on the command line, if any.
    #[must_use]
    pub fn requested_device(&self) -> Option<InferenceDevice> {
        if self.cpu {
            Some(InferenceDevice::Cpu)
        } else {
            self.device
        }
    }
}
