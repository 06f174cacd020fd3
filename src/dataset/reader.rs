//! Labeled dataset reader.
//!
//! Reads a delimited file with a header row and extracts two columns: the
//! headword and its CEFR level. Column names are matched exactly
//! (case-sensitive) against the configured identifiers; there is no
//! auto-detection. A missing column is reported before any row is read:
//!
//! ```csv
//! headword,pos,CEFR
//! abandon,verb,B2
//! ability,noun,A2
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::ReaderBuilder;
use log::info;

use crate::error::{LugatError, Result};

/// One data row as it appears in the file, before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub headword: String,
    pub level: String,
}

/// The rows of a dataset file together with its header.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    /// Column names as found in the header.
    pub columns: Vec<String>,
    /// Extracted (headword, level) cells, in file order.
    pub records: Vec<RawRecord>,
}

impl RawDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reader for (headword, level) datasets.
#[derive(Debug, Clone)]
pub struct DatasetReader {
    headword_column: String,
    level_column: String,
    /// Field delimiter (default: ',')
    delimiter: u8,
}

impl Default for DatasetReader {
    fn default() -> Self {
        Self::new("headword", "CEFR")
    }
}

impl DatasetReader {
    /// Create a reader for the given column names.
    pub fn new<H: Into<String>, L: Into<String>>(headword_column: H, level_column: L) -> Self {
        DatasetReader {
            headword_column: headword_column.into(),
            level_column: level_column.into(),
            delimiter: b',',
        }
    }

    /// Set a custom delimiter character.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read a dataset file.
    pub fn read_path(&self, path: &Path) -> Result<RawDataset> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                LugatError::invalid_config(format!("dataset file not found: {}", path.display()))
            }
            _ => LugatError::Io(e),
        })?;
        let dataset = self.read_from(file)?;
        info!(
            "Read {} rows from {} (columns: {:?})",
            dataset.len(),
            path.display(),
            dataset.columns
        );
        Ok(dataset)
    }

    /// Read a dataset from any byte source.
    pub fn read_from<R: Read>(&self, source: R) -> Result<RawDataset> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(source);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let headword_idx = columns.iter().position(|c| *c == self.headword_column);
        let level_idx = columns.iter().position(|c| *c == self.level_column);

        let (headword_idx, level_idx) = match (headword_idx, level_idx) {
            (Some(h), Some(l)) => (h, l),
            _ => {
                return Err(LugatError::MissingColumns {
                    required: vec![self.headword_column.clone(), self.level_column.clone()],
                    found: columns,
                });
            }
        };

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(RawRecord {
                headword: record.get(headword_idx).unwrap_or_default().to_string(),
                level: record.get(level_idx).unwrap_or_default().to_string(),
            });
        }

        Ok(RawDataset { columns, records })
    }
}
