//! Inference engine seam and the ONNX Runtime implementation.

use crate::config::InferenceDevice;
use crate::constants::APP_NAME;
use crate::error::{Error, Result};
use crate::inference::preprocess::InputTensor;
use crate::inference::provider::select_execution_providers;
use memmap2::Mmap;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::fs::File;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// A loaded model that maps an input tensor to a flat score vector.
///
/// For a batch of `n` images the returned vector holds `n` consecutive
/// rows of per-category scores.
pub trait InferenceEngine: Send + Sync {
    /// Run one forward pass.
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>>;

    /// Name of the execution provider in use.
    fn provider(&self) -> &str;
}

/// Model file mapped read-only into memory in full.
pub struct ModelAsset {
    path: PathBuf,
    map: Mmap,
}

impl ModelAsset {
    /// Map a model file.
    ///
    /// # Errors
    /// - [`Error::ModelFileNotFound`] if the path does not exist
    /// - [`Error::ModelLoad`] if the file cannot be opened, mapped, or is empty
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "model file is empty".to_string(),
            });
        }

        let map = map_read_only(&file).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!("Mapped {} bytes from {}", map.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            map,
        })
    }

    /// Path the asset was mapped from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapped model bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.map
    }
}

#[allow(unsafe_code)]
fn map_read_only(file: &File) -> std::io::Result<Mmap> {
    // SAFETY: the map is read-only and never outlives `ModelAsset`. Model
    // files are not rewritten while a classifier holds them.
    unsafe { Mmap::map(file) }
}

/// Initialize the global ONNX Runtime environment.
///
/// # Errors
/// Returns [`Error::RuntimeInitialization`] if the runtime library cannot be
/// loaded.
pub fn init_runtime() -> Result<()> {
    ort::init()
        .with_name(APP_NAME)
        .commit()
        .map_err(|e| Error::RuntimeInitialization {
            reason: e.to_string(),
        })?;
    Ok(())
}

/// ONNX Runtime backed engine.
pub struct OrtEngine {
    session: Mutex<Session>,
    provider: &'static str,
    // Kept so the mapping lives as long as the session built from it.
    _asset: ModelAsset,
}

impl OrtEngine {
    /// Build a session from mapped model bytes.
    ///
    /// A panic inside the runtime (e.g. a missing shared library) is caught
    /// and reported as a load error.
    ///
    /// # Errors
    /// Returns [`Error::ModelLoad`] if the runtime rejects the model, or
    /// [`Error::RuntimeInitialization`] if the runtime cannot start.
    pub fn from_asset(
        asset: ModelAsset,
        device: InferenceDevice,
        threads: Option<usize>,
    ) -> Result<Self> {
        let built = std::panic::catch_unwind(AssertUnwindSafe(|| {
            build_session(&asset, device, threads)
        }));

        let (session, provider) = match built {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::ModelLoad {
                    path: asset.path().to_path_buf(),
                    reason: "ONNX Runtime panicked while building session".to_string(),
                });
            }
        };

        info!(
            "Loaded model: {}, device: {}",
            asset.path().display(),
            provider
        );

        Ok(Self {
            session: Mutex::new(session),
            provider,
            _asset: asset,
        })
    }
}

fn build_session(
    asset: &ModelAsset,
    device: InferenceDevice,
    threads: Option<usize>,
) -> Result<(Session, &'static str)> {
    let load_err = |e: &dyn std::fmt::Display| Error::ModelLoad {
        path: asset.path().to_path_buf(),
        reason: e.to_string(),
    };

    init_runtime()?;
    let (providers, provider) = select_execution_providers(device);

    let mut builder = Session::builder()
        .map_err(|e| load_err(&e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_err(&e))?;

    if let Some(threads) = threads {
        builder = builder
            .with_intra_threads(threads)
            .map_err(|e| load_err(&e))?;
    }

    if !providers.is_empty() {
        builder = builder
            .with_execution_providers(providers)
            .map_err(|e| load_err(&e))?;
    }

    let session = builder
        .commit_from_memory(asset.bytes())
        .map_err(|e| load_err(&e))?;

    Ok((session, provider))
}

impl InferenceEngine for OrtEngine {
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>> {
        let inference_err = |e: &dyn std::fmt::Display| Error::Inference {
            reason: e.to_string(),
        };

        let tensor = Tensor::from_array((input.shape(), input.data().to_vec()))
            .map_err(|e| inference_err(&e))?;

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "session lock poisoned".to_string(),
        })?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| inference_err(&e))?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_err(&e))?;

        Ok(scores.to_vec())
    }

    fn provider(&self) -> &str {
        self.provider
    }
}
