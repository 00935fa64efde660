//! Conversion of a scaled image into the model's input tensor.

use crate::constants::{CHANNEL_SCALE, CHANNELS};
use crate::error::{Error, Result};
use crate::imaging::PixelImage;

/// Flat NHWC float tensor, channels interleaved per pixel as R, G, B.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
    batch_size: usize,
    side: u32,
}

impl InputTensor {
    /// Wrap raw tensor data.
    ///
    /// No length check is done here; a mismatched buffer is left for the
    /// engine to reject.
    #[must_use]
    pub fn from_raw(data: Vec<f32>, batch_size: usize, side: u32) -> Self {
        Self {
            data,
            batch_size,
            side,
        }
    }

    /// Tensor values.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume the tensor and return its values.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Number of images in the batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Side length of each square image.
    #[must_use]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Declared shape `[batch, side, side, 3]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        let side = self.side as usize;
        [self.batch_size, side, side, CHANNELS]
    }

    /// Number of floats the declared shape requires.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.shape().iter().product()
    }
}

/// Build the input tensor for a single image already scaled to `side x side`.
///
/// # Errors
/// - [`Error::MissingImage`] if `image` is `None`
/// - [`Error::InvalidImageDimensions`] if the image is not `side x side`
pub fn build_input_tensor(image: Option<&PixelImage>, side: u32) -> Result<InputTensor> {
    let image = image.ok_or(Error::MissingImage)?;
    let mut data = Vec::with_capacity(side as usize * side as usize * CHANNELS);
    push_image(&mut data, image, side)?;
    Ok(InputTensor::from_raw(data, 1, side))
}

/// Build a batched input tensor from several images, in the given order.
///
/// # Errors
/// - [`Error::MissingImage`] if `images` is empty
/// - [`Error::InvalidImageDimensions`] if any image is not `side x side`
pub fn build_batch_tensor(images: &[PixelImage], side: u32) -> Result<InputTensor> {
    if images.is_empty() {
        return Err(Error::MissingImage);
    }

    let per_image = side as usize * side as usize * CHANNELS;
    let mut data = Vec::with_capacity(images.len() * per_image);
    for image in images {
        push_image(&mut data, image, side)?;
    }
    Ok(InputTensor::from_raw(data, images.len(), side))
}

fn push_image(data: &mut Vec<f32>, image: &PixelImage, side: u32) -> Result<()> {
    if side == 0 || image.width() != side || image.height() != side {
        return Err(Error::InvalidImageDimensions {
            width: image.width(),
            height: image.height(),
            expected: side,
        });
    }

    for &pixel in image.pixels() {
        let [red, green, blue] = unpack_rgb(pixel);
        data.push(f32::from(red) / CHANNEL_SCALE);
        data.push(f32::from(green) / CHANNEL_SCALE);
        data.push(f32::from(blue) / CHANNEL_SCALE);
    }
    Ok(())
}

/// Extract red, green and blue from a packed pixel. Alpha is dropped.
#[allow(clippy::cast_possible_truncation)]
#[inline]
fn unpack_rgb(pixel: u32) -> [u8; 3] {
    [
        ((pixel >> 16) & 0xFF) as u8,
        ((pixel >> 8) & 0xFF) as u8,
        (pixel & 0xFF) as u8,
    ]
}
