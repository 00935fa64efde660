//! CSV output format writer.

use crate::constants::confidence::DECIMAL_PLACES;
use crate::error::{Error, Result};
use crate::output::{ClassificationRecord, OutputWriter};
use std::fs::File;
use std::path::{Path, PathBuf};

const HEADER: [&str; 5] = ["File", "Rank", "Label", "Display name", "Probability"];

/// CSV format output writer.
pub struct CsvWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|e| Error::CsvWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    fn csv_err(&self, source: csv::Error) -> Error {
        Error::CsvWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        self.writer
            .write_record(HEADER)
            .map_err(|e| self.csv_err(e))
    }

    fn write_record(&mut self, record: &ClassificationRecord) -> Result<()> {
        let file = record.file_path.display().to_string();
        let rank = record.rank.to_string();
        let probability = format!("{:.decimal$}", record.probability, decimal = DECIMAL_PLACES);

        self.writer
            .write_record([
                file.as_str(),
                rank.as_str(),
                record.label.as_str(),
                record.display_name.as_str(),
                probability.as_str(),
            ])
            .map_err(|e| self.csv_err(e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inference::Classification;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_writer_basic() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path()).unwrap();

        writer.write_header().unwrap();
        let classification = Classification {
            label: "house_sparrow".to_string(),
            probability: 0.854_21,
            index: Some(3),
        };
        let record = ClassificationRecord::from_classification(
            &classification,
            1,
            PathBuf::from("/photos/garden.jpg"),
        );
        writer.write_record(&record).unwrap();
        writer.finalize().unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("File,Rank,Label,Display name,Probability"));
        assert_eq!(
            lines.next(),
            Some("/photos/garden.jpg,1,house_sparrow,House Sparrow,0.8542")
        );
    }

    #[test]
    fn test_csv_writer_quotes_commas() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path()).unwrap();

        let record = ClassificationRecord::from_classification(
            &Classification::not_found(),
            1,
            PathBuf::from("a,b.jpg"),
        );
        writer.write_record(&record).unwrap();
        writer.finalize().unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.starts_with("\"a,b.jpg\",1,Not found,Not Found,0.0000"));
    }
}
