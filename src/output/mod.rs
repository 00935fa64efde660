//! Output format writers.

mod csv;
mod json;
pub mod progress;
mod types;
mod writer;

pub use self::csv::CsvWriter;
pub use json::{JsonResult, JsonResultFile, JsonResultWriter, JsonSettings};
pub use types::ClassificationRecord;
pub use writer::OutputWriter;
