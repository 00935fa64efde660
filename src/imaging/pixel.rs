//! Packed in-memory pixel image.

use crate::error::{Error, Result};
use image::DynamicImage;

/// Decoded bitmap with one packed `0xAARRGGBB` value per pixel.
///
/// Pixels are stored row-major, top row first, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelImage {
    /// Build an image from packed pixels.
    ///
    /// # Errors
    /// Returns [`Error::InvalidImage`] if `pixels.len() != width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(Error::InvalidImage {
                reason: format!(
                    "{width}x{height} image needs {expected} pixels, got {}",
                    pixels.len()
                ),
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image filled with a single packed colour.
    #[must_use]
    pub fn filled(width: u32, height: u32, argb: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![argb; width as usize * height as usize],
        }
    }

    /// Pack a decoded image.
    #[must_use]
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                u32::from_be_bytes([a, r, g, b])
            })
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}
