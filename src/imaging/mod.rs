//! Image decoding and scaling ahead of preprocessing.

mod load;
mod pixel;

pub use load::{is_image_file, load_image, scale_to_square};
pub use pixel::PixelImage;
