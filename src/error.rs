//! Error types for birdeye.

use std::path::PathBuf;

/// Result type alias for birdeye operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure category, used to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Model or category asset missing or corrupt. Classification stays
    /// unavailable until a successful reload.
    Load,
    /// Absent or mis-shaped image. Only the current call is aborted.
    Input,
    /// Engine failure during the forward pass.
    Inference,
    /// Configuration or command-line problem.
    Config,
    /// Filesystem or output failure unrelated to the model.
    Io,
}

/// Top-level error type for birdeye.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Model not found in configuration.
    #[error("model '{name}' not found in configuration")]
    ModelNotFound {
        /// Name of the missing model.
        name: String,
    },

    /// Model already exists in configuration.
    #[error("model '{name}' already exists in configuration")]
    ModelAlreadyExists {
        /// Name of the existing model.
        name: String,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Labels file does not exist.
    #[error("labels file does not exist: {path}")]
    LabelsFileNotFound {
        /// Path to the missing labels file.
        path: PathBuf,
    },

    /// Failed to read the category labels.
    #[error("failed to read labels file '{path}'")]
    LabelsRead {
        /// Path to the labels file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Model bytes could not be mapped or handed to the engine.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: PathBuf,
        /// Description of the load failure.
        reason: String,
    },

    /// Failed to initialize the inference runtime.
    #[error("failed to initialize ONNX runtime: {reason}")]
    RuntimeInitialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// No image was supplied to the preprocessor.
    #[error("no image supplied for classification")]
    MissingImage,

    /// Pixel buffer does not match the declared geometry.
    #[error("invalid image: {reason}")]
    InvalidImage {
        /// Description of the mismatch.
        reason: String,
    },

    /// Image is not the square size the model expects.
    #[error("image is {width}x{height}, model expects {expected}x{expected}")]
    InvalidImageDimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Expected side length.
        expected: u32,
    },

    /// Failed to open or decode an image file.
    #[error("failed to open image '{path}'")]
    ImageOpen {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// No image files found in the provided inputs.
    #[error("no valid image files found in the provided paths")]
    NoValidImageFiles,

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Background classification task ended without delivering a result.
    #[error("classification task failed: {reason}")]
    TaskFailed {
        /// Description of the task failure.
        reason: String,
    },

    /// Failed to write CSV output.
    #[error("failed to write CSV output '{path}'")]
    CsvWrite {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Classify this error into its failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelFileNotFound { .. }
            | Self::LabelsFileNotFound { .. }
            | Self::LabelsRead { .. }
            | Self::ModelLoad { .. }
            | Self::RuntimeInitialization { .. } => ErrorKind::Load,
            Self::MissingImage
            | Self::InvalidImage { .. }
            | Self::InvalidImageDimensions { .. }
            | Self::ImageOpen { .. }
            | Self::NoValidImageFiles => ErrorKind::Input,
            Self::Inference { .. } | Self::TaskFailed { .. } => ErrorKind::Inference,
            Self::ConfigDirNotFound
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. }
            | Self::ConfigValidation { .. }
            | Self::ModelNotFound { .. }
            | Self::ModelAlreadyExists { .. } => ErrorKind::Config,
            Self::Io(_)
            | Self::CsvWrite { .. }
            | Self::JsonWrite { .. }
            | Self::Internal { .. } => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_taxonomy() {
        let load = Error::ModelFileNotFound {
            path: PathBuf::from("model.onnx"),
        };
        assert_eq!(load.kind(), ErrorKind::Load);

        assert_eq!(Error::MissingImage.kind(), ErrorKind::Input);

        let inference = Error::Inference {
            reason: "shape mismatch".to_string(),
        };
        assert_eq!(inference.kind(), ErrorKind::Inference);
    }

    #[test]
    fn test_dimension_error_message() {
        let err = Error::InvalidImageDimensions {
            width: 100,
            height: 80,
            expected: 224,
        };
        assert_eq!(err.to_string(), "image is 100x80, model expects 224x224");
    }
}
