//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "birdeye";

/// Default square input side length of the CNN, in pixels.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Default inference batch size. Observed usage is always one image.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Default number of ranked results reported per image.
pub const DEFAULT_TOP_K: usize = 3;

/// Default minimum probability for a ranked result to be reported.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.0;

/// Colour channels per pixel in the input tensor (R, G, B).
pub const CHANNELS: usize = 3;

/// Divisor mapping an 8-bit channel into [0.0, 1.0].
pub const CHANNEL_SCALE: f32 = 255.0;

/// Sentinel values used when no classification is available.
pub mod sentinel {
    /// Label reported when no category could be selected.
    pub const NOT_FOUND_LABEL: &str = "Not found";

    /// Probability reported alongside [`NOT_FOUND_LABEL`].
    pub const PROBABILITY: f32 = 0.0;

    /// Initial running maximum for the argmax scan. Any real score beats it.
    pub const INITIAL_MAX: f32 = -1.0;
}

/// Output file extensions by format.
pub mod output_extensions {
    /// CSV output extension.
    pub const CSV: &str = ".birdeye.csv";
    /// JSON output extension.
    pub const JSON: &str = ".birdeye.json";
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Decimal places for confidence formatting.
    pub const DECIMAL_PLACES: usize = 4;
}

/// Image file extensions picked up when scanning directories.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff",
];
