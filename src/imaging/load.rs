//! Image file decoding and square scaling.

use crate::constants::IMAGE_EXTENSIONS;
use crate::error::{Error, Result};
use crate::imaging::PixelImage;
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::Path;

/// Decode an image file from disk.
///
/// # Errors
/// Returns [`Error::ImageOpen`] if the file is missing or cannot be decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| Error::ImageOpen {
        path: path.to_path_buf(),
        source,
    })
}

/// Scale an image to `side x side` with bilinear smoothing and pack it.
///
/// The aspect ratio is not preserved.
#[must_use]
pub fn scale_to_square(img: &DynamicImage, side: u32) -> PixelImage {
    if img.width() == side && img.height() == side {
        return PixelImage::from_dynamic(img);
    }
    let resized = img.resize_exact(side, side, FilterType::Triangle);
    PixelImage::from_dynamic(&resized)
}

/// Check if a file has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}
