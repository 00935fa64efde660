//! Inference path: preprocessing, model loading, invocation and reduction.

mod classifier;
pub mod engine;
pub mod labels;
mod loader;
pub mod preprocess;
pub mod provider;

pub use classifier::{BirdClassifier, Classification, rank, reduce};
pub use engine::{InferenceEngine, ModelAsset, OrtEngine, init_runtime};
pub use labels::{CategoryList, display_name, load_categories};
pub use loader::{LoadOptions, load};
pub use preprocess::{InputTensor, build_batch_tensor, build_input_tensor};
