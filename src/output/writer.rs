//! Output writer trait definition.

use crate::error::Result;
use crate::output::ClassificationRecord;

/// Trait for writing classification results.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write a single ranked result.
    fn write_record(&mut self, record: &ClassificationRecord) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}
