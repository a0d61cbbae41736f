//! Loading raw records from delimited text files

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::error::{LensError, Result};
use crate::schema::{RawRecord, SENTINEL};

/// CSV loader producing string-valued records
#[derive(Debug, Clone)]
pub struct DataLoader {
    separator: u8,
    has_header: bool,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            separator: b',',
            has_header: true,
        }
    }

    /// Set the field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Read a CSV file with every column as text
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path)
            .map_err(|e| LensError::InputFormat(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(self.separator);
        // schema inference off: all columns are read as strings
        let df = CsvReadOptions::default()
            .with_has_header(self.has_header)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()?;

        let records = records_from_frame(&df)?;
        info!(
            path = %path.display(),
            rows = records.len(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded records"
        );
        Ok(records)
    }
}

/// Convert a data frame into records; nulls and blank cells become the
/// missing-value sentinel
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let mut records = vec![RawRecord::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series().cast(&DataType::String)?;
        let values = series.str()?;

        for (record, value) in records.iter_mut().zip(values.into_iter()) {
            let token = match value {
                Some(v) if !v.trim().is_empty() => v,
                _ => SENTINEL,
            };
            record.insert(name.clone(), token);
        }
    }

    Ok(records)
}
