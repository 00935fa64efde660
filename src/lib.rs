//! Birdeye - bird species recognition for still images.
//!
//! This crate classifies photos with an ONNX image model: images are scaled
//! to the model's square input, normalized into an RGB tensor and the best
//! scoring categories are reported.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod imaging;
pub mod inference;
pub mod output;
pub mod pipeline;

use clap::Parser;
use cli::{ClassifyArgs, Cli, Command};
use config::{
    Config, InferenceDevice, ModelConfig, config_file_path, load_default_config,
    save_default_config,
};
use constants::{DEFAULT_BATCH_SIZE, DEFAULT_INPUT_SIZE};
use inference::{BirdClassifier, LoadOptions};
use pipeline::{
    BatchItem, ClassificationService, ProcessCheck, ProcessOptions, collect_input_files,
    output_dir_for, process_batch, should_process,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use error::{Error, Result};

/// Main entry point for the birdeye CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.classify.verbose, cli.classify.quiet);

    let config = load_default_config()?;

    if let Some(command) = cli.command {
        return handle_command(command, &config);
    }

    if cli.inputs.is_empty() {
        cli::help::print_smart_help(&config);
        return Ok(());
    }

    classify_files(&cli.inputs, &cli.classify, &config)
}

/// Model files, input size and batch size after applying CLI overrides.
#[derive(Debug, PartialEq, Eq)]
struct ResolvedModel {
    name: String,
    path: PathBuf,
    labels: PathBuf,
    input_size: u32,
    batch_size: usize,
}

/// Pick the model from `--model-path`, `--model` or the configured default.
fn resolve_model(args: &ClassifyArgs, config: &Config) -> Result<ResolvedModel> {
    let mut resolved = if let Some(path) = &args.model_path {
        let labels = args
            .labels_path
            .clone()
            .ok_or_else(|| Error::ConfigValidation {
                message: "--model-path requires --labels-path".to_string(),
            })?;
        let name = path
            .file_stem()
            .map_or_else(|| "custom".to_string(), |s| s.to_string_lossy().into_owned());
        ResolvedModel {
            name,
            path: path.clone(),
            labels,
            input_size: DEFAULT_INPUT_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    } else {
        let name = args
            .model
            .clone()
            .or_else(|| config.defaults.model.clone())
            .ok_or_else(|| Error::ConfigValidation {
                message: "no model specified (use -m, --model-path or set defaults.model in config)"
                    .to_string(),
            })?;
        let model = config::get_model(config, &name)?;
        ResolvedModel {
            name,
            path: model.path.clone(),
            labels: args
                .labels_path
                .clone()
                .unwrap_or_else(|| model.labels.clone()),
            input_size: model.input_size,
            batch_size: model.batch_size,
        }
    };

    if let Some(size) = args.input_size {
        resolved.input_size = size;
    }
    if let Some(size) = args.batch_size {
        resolved.batch_size = size as usize;
    }

    Ok(resolved)
}

/// Classify input images with the given options.
fn classify_files(inputs: &[PathBuf], args: &ClassifyArgs, config: &Config) -> Result<()> {
    use crate::output::progress;
    use std::time::Instant;

    let total_start = Instant::now();

    let files = collect_input_files(inputs)?;
    info!("Found {} image file(s) to process", files.len());

    let model = resolve_model(args, config)?;
    let options = ProcessOptions {
        output_dir: args.output_dir.clone(),
        formats: args
            .format
            .clone()
            .unwrap_or_else(|| config.defaults.formats.clone()),
        force: args.force,
        top_k: args
            .top_k
            .map_or(config.defaults.top_k, |k| k as usize),
        min_confidence: args
            .min_confidence
            .unwrap_or(config.defaults.min_confidence),
        model_name: model.name.clone(),
        stdout: args.stdout,
    };

    let load_options = LoadOptions {
        device: args
            .requested_device()
            .unwrap_or(config.inference.device),
        threads: config.inference.threads,
    };

    info!("Loading model: {}", model.name);
    let classifier = BirdClassifier::load(
        &model.path,
        &model.labels,
        model.input_size,
        &load_options,
    );
    if !classifier.is_available() {
        warn!(
            "Model '{}' is unavailable; images will be reported as '{}'",
            model.name,
            constants::sentinel::NOT_FOUND_LABEL
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name(constants::APP_NAME)
        .build()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create async runtime: {e}"),
        })?;
    let service = ClassificationService::new(Arc::new(classifier), runtime.handle().clone());

    let progress_enabled = !args.quiet && !args.no_progress && !args.stdout;
    let file_progress = progress::create_file_progress(files.len(), progress_enabled);

    let mut processed = 0_usize;
    let mut skipped = 0_usize;
    let mut errors = 0_usize;
    let mut not_found = 0_usize;

    let mut pending = Vec::with_capacity(files.len());
    for file in &files {
        let file_output_dir = output_dir_for(file, options.output_dir.as_deref());

        if !options.stdout
            && should_process(file, &file_output_dir, &options.formats, options.force)
                == ProcessCheck::SkipExists
        {
            info!("Skipping (output exists): {}", file.display());
            skipped += 1;
            progress::inc_progress(file_progress.as_ref());
            continue;
        }

        if !options.stdout && !file_output_dir.exists() {
            std::fs::create_dir_all(&file_output_dir)?;
        }

        pending.push(BatchItem {
            input: file.clone(),
            output_dir: file_output_dir,
        });
    }

    info!("Batch size: {}", model.batch_size);
    for chunk in pending.chunks(model.batch_size.max(1)) {
        if let Some(first) = chunk.first() {
            progress::set_current_file(
                file_progress.as_ref(),
                &first
                    .input
                    .file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            );
        }

        for (item, outcome) in chunk.iter().zip(process_batch(chunk, &service, &options)) {
            match outcome {
                Ok(result) => {
                    processed += 1;
                    if !result.top().is_some_and(inference::Classification::is_found) {
                        not_found += 1;
                    }
                }
                Err(e) => {
                    error!("Failed to process {}: {}", item.input.display(), e);
                    errors += 1;
                    if args.fail_fast {
                        progress::finish_progress(file_progress, "Failed");
                        return Err(e);
                    }
                }
            }
            progress::inc_progress(file_progress.as_ref());
        }
    }

    progress::finish_progress(file_progress, "Complete");

    let total_duration = total_start.elapsed().as_secs_f64();
    info!(
        "Complete: {} processed, {} skipped, {} errors, {} not found in {:.2}s",
        processed, skipped, errors, not_found, total_duration
    );

    if processed > 0 {
        #[allow(clippy::cast_precision_loss)]
        let images_per_sec = if total_duration > 0.0 {
            processed as f64 / total_duration
        } else {
            0.0
        };
        info!("Performance: {:.1} images/sec overall", images_per_sec);
    }

    if errors > 0 {
        warn!("{} file(s) had errors", errors);
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default; accelerator fallback is expected
    // in auto mode. -v shows ORT warnings, -vv info, -vvv everything.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // Logs go to stderr so --stdout results stay machine readable.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action),
        Command::Models { action } => handle_models_command(action, config),
        Command::Species {
            model,
            labels,
            output,
        } => cli::species::list_species(config, model, labels, output),
        Command::Providers => {
            handle_providers_command();
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_providers_command() {
    use inference::provider::{is_device_available, provider_metadata};

    println!("Execution providers:");
    println!();

    for device in [
        InferenceDevice::Cpu,
        InferenceDevice::Nnapi,
        InferenceDevice::Xnnpack,
        InferenceDevice::CoreMl,
        InferenceDevice::Cuda,
    ] {
        let meta = provider_metadata(device);
        let marker = if is_device_available(device) { "✓" } else { "✗" };
        println!("  {marker} {:<8} {}", meta.id, meta.description);
    }

    println!();
    println!("To use a specific provider:");
    println!("  --device <id>   Request a provider (falls back to CPU if unavailable)");
    println!("  --cpu           Use CPU only");
    println!("  (default)       Auto-select (NNAPI, CoreML, XNNPACK, then CPU)");
    println!();
    println!("Note: availability depends on the ONNX Runtime build that is loaded.");
    println!("      Check log output for actual provider selection during inference.");
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: cli::ConfigAction) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
                println!("Use 'birdeye models add' to add models.");
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!(
                    "  birdeye models add <name> --path <model.onnx> --labels <labels.txt> --default"
                );
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            let text = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", config_file_path()?.display());
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_models_command(action: cli::ModelsAction, config: &Config) -> Result<()> {
    use cli::ModelsAction;

    match action {
        ModelsAction::List => {
            if config.models.is_empty() {
                println!("No models configured.");
            } else {
                println!("Configured models:");
                let mut names: Vec<_> = config.models.keys().collect();
                names.sort();
                for name in names {
                    let model = &config.models[name];
                    let default_marker = config.defaults.model.as_ref().is_some_and(|d| d == name);
                    println!(
                        "  {} ({}x{}){}",
                        name,
                        model.input_size,
                        model.input_size,
                        if default_marker { " [default]" } else { "" }
                    );
                }
            }
            Ok(())
        }
        ModelsAction::Add {
            name,
            path,
            labels,
            input_size,
            default,
        } => handle_models_add(name, path, labels, input_size, default),
        ModelsAction::Check => {
            if config.models.is_empty() {
                println!("No models configured.");
            }
            for (name, model) in &config.models {
                config::validate_model_config(name, model)?;
                println!("  {name}: OK");
            }
            Ok(())
        }
    }
}

/// Handle the `models add` command.
#[allow(clippy::print_stdout)]
fn handle_models_add(
    name: String,
    path: PathBuf,
    labels: PathBuf,
    input_size: Option<u32>,
    set_default: bool,
) -> Result<()> {
    if !path.exists() {
        return Err(Error::ModelFileNotFound { path });
    }
    if !labels.exists() {
        return Err(Error::LabelsFileNotFound { path: labels });
    }

    let mut config = load_default_config()?;

    if config.models.contains_key(&name) {
        return Err(Error::ModelAlreadyExists { name });
    }

    let input_size = input_size.unwrap_or(DEFAULT_INPUT_SIZE);
    config.models.insert(
        name.clone(),
        ModelConfig {
            path: path.clone(),
            labels: labels.clone(),
            input_size,
            batch_size: DEFAULT_BATCH_SIZE,
        },
    );

    if set_default {
        config.defaults.model = Some(name.clone());
    }

    let config_path = save_default_config(&config)?;

    println!("Added model '{name}' ({input_size}x{input_size})");
    println!("  Model: {}", path.display());
    println!("  Labels: {}", labels.display());
    println!("  Default: {}", if set_default { "yes" } else { "no" });
    println!("\nConfiguration saved to: {}", config_path.display());

    Ok(())
}
