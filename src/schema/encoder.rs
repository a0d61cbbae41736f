//! Feature encoding of raw records into a numeric matrix

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use super::detector::{parse_numeric, parse_timestamp, SchemaDetector};
use super::{ColumnType, RawRecord, SENTINEL};
use crate::error::{LensError, Result};

/// Per-column encoding strategy, fitted once per analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnEncoder {
    /// Parsed as `f64`; unparsable cells become 0
    Numeric,
    /// Unix epoch seconds; missing cells become 0
    Timestamp,
    /// Label encoding: category -> code in first-seen order
    Categorical { mapping: HashMap<String, usize> },
}

impl ColumnEncoder {
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnEncoder::Numeric => ColumnType::Numeric,
            ColumnEncoder::Timestamp => ColumnType::Timestamp,
            ColumnEncoder::Categorical { .. } => ColumnType::Categorical,
        }
    }

    fn build_mapping<'a>(values: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
        let mut mapping = HashMap::new();
        for val in values {
            if !mapping.contains_key(val) {
                let idx = mapping.len();
                mapping.insert(val.to_string(), idx);
            }
        }
        mapping
    }

    /// Encode one cell. Unseen categories map to the out-of-vocabulary
    /// code `mapping.len()`.
    fn encode(&self, column: &str, token: &str) -> Result<f64> {
        match self {
            ColumnEncoder::Numeric => Ok(parse_numeric(token).unwrap_or(0.0)),
            ColumnEncoder::Timestamp => {
                if token == SENTINEL {
                    return Ok(0.0);
                }
                parse_timestamp(token)
                    .map(|secs| secs as f64)
                    .ok_or_else(|| LensError::Encoding {
                        column: column.to_string(),
                        reason: format!("'{}' is not a recognized timestamp", token),
                    })
            }
            ColumnEncoder::Categorical { mapping } => {
                Ok(mapping.get(token).copied().unwrap_or(mapping.len()) as f64)
            }
        }
    }
}

/// A named column together with its fitted encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub encoder: ColumnEncoder,
}

/// N×K numeric matrix; row i corresponds to input record i
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }
}

/// Fitted schema encoder for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    columns: Vec<ColumnSpec>,
}

impl FeatureEncoder {
    /// Detect the schema and fit categorical encoders
    pub fn fit(records: &[RawRecord]) -> Result<Self> {
        let schema = SchemaDetector::new().detect(records)?;

        let columns = schema
            .into_iter()
            .map(|(name, dtype)| {
                let encoder = match dtype {
                    ColumnType::Numeric => ColumnEncoder::Numeric,
                    ColumnType::Timestamp => ColumnEncoder::Timestamp,
                    ColumnType::Categorical => ColumnEncoder::Categorical {
                        mapping: ColumnEncoder::build_mapping(
                            records.iter().map(|r| r.value_or_sentinel(&name)),
                        ),
                    },
                };
                ColumnSpec { name, encoder }
            })
            .collect();

        Ok(Self { columns })
    }

    /// Encode records with the fitted encoders
    pub fn transform(&self, records: &[RawRecord]) -> Result<FeatureMatrix> {
        if records.is_empty() {
            return Err(LensError::EmptyDataset);
        }

        let n_rows = records.len();
        let n_cols = self.columns.len();
        let mut values = Array2::<f64>::zeros((n_rows, n_cols));

        for (j, column) in self.columns.iter().enumerate() {
            for (i, record) in records.iter().enumerate() {
                values[[i, j]] = column.encoder.encode(&column.name, record.value_or_sentinel(&column.name))?;
            }
        }

        info!(rows = n_rows, columns = n_cols, "Encoded feature matrix");

        Ok(FeatureMatrix {
            columns: self.column_names(),
            values,
        })
    }

    /// Fit and transform in one step
    pub fn fit_transform(records: &[RawRecord]) -> Result<(Self, FeatureMatrix)> {
        let encoder = Self::fit(records)?;
        let matrix = encoder.transform(records)?;
        Ok((encoder, matrix))
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Column names paired with their types
    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.encoder.column_type()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<RawRecord> {
        vec![
            RawRecord::new().with("ts", "1970-01-01 00:00:10").with("action", "login").with("bytes", "100"),
            RawRecord::new().with("ts", "1970-01-01 00:00:20").with("action", "logout").with("bytes", "oops"),
            RawRecord::new().with("ts", "UNKNOWN").with("action", "login").with("bytes", "UNKNOWN"),
        ]
    }

    #[test]
    fn test_label_encoding_first_seen_order() {
        let (encoder, matrix) = FeatureEncoder::fit_transform(&sample_records()).unwrap();

        assert_eq!(encoder.schema()[1], ("action".to_string(), ColumnType::Categorical));
        assert_eq!(matrix.values.column(1).to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_numeric_and_timestamp_encoding() {
        let records = vec![
            RawRecord::new().with("ts", "1970-01-01 00:00:10").with("bytes", "100"),
            RawRecord::new().with("ts", "UNKNOWN").with("bytes", "UNKNOWN"),
        ];
        let (_, matrix) = FeatureEncoder::fit_transform(&records).unwrap();

        assert_eq!(matrix.values.row(0).to_vec(), vec![10.0, 100.0]);
        assert_eq!(matrix.values.row(1).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_row_count_matches_records() {
        let records = sample_records();
        let (_, matrix) = FeatureEncoder::fit_transform(&records).unwrap();
        assert_eq!(matrix.nrows(), records.len());
        assert_eq!(matrix.ncols(), 3);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let records = sample_records();
        let (_, first) = FeatureEncoder::fit_transform(&records).unwrap();
        let (_, second) = FeatureEncoder::fit_transform(&records).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unseen_category_gets_oov_code() {
        let encoder = FeatureEncoder::fit(&sample_records()).unwrap();
        let fresh = vec![RawRecord::new().with("action", "sudo")];
        let matrix = encoder.transform(&fresh).unwrap();
        // login, logout -> 0, 1; unseen -> 2
        assert_eq!(matrix.values[[0, 1]], 2.0);
    }

    #[test]
    fn test_bad_timestamp_on_transform_is_encoding_error() {
        let encoder = FeatureEncoder::fit(&sample_records()).unwrap();
        let fresh = vec![RawRecord::new().with("ts", "last tuesday")];
        assert!(matches!(
            encoder.transform(&fresh),
            Err(LensError::Encoding { .. })
        ));
    }

    #[test]
    fn test_empty_records() {
        assert!(matches!(
            FeatureEncoder::fit_transform(&[]),
            Err(LensError::EmptyDataset)
        ));
    }
}
