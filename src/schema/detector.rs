//! Automatic column type detection

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::{column_names, ColumnType, RawRecord, SENTINEL};
use crate::error::{LensError, Result};

/// Naive date-time layouts, interpreted as UTC
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight UTC
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a token as a timestamp, returning Unix epoch seconds
pub fn parse_timestamp(token: &str) -> Option<i64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(token, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.timestamp());
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(token, format) {
            return Some(naive.and_utc().timestamp());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }
    None
}

/// Parse a token as a finite number.
///
/// `inf`, `NaN` and overflowing literals parse as `f64` but are rejected,
/// so a column holding them is not numeric and never feeds non-finite
/// values into training.
pub(crate) fn parse_numeric(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column type detector over raw records
#[derive(Debug, Clone, Default)]
pub struct SchemaDetector;

impl SchemaDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect the type of every column, in first-appearance order
    pub fn detect(&self, records: &[RawRecord]) -> Result<Vec<(String, ColumnType)>> {
        if records.is_empty() {
            return Err(LensError::EmptyDataset);
        }

        let schema: Vec<(String, ColumnType)> = column_names(records)
            .into_iter()
            .map(|name| {
                let dtype = self.infer_column(records.iter().map(|r| r.value_or_sentinel(&name)));
                (name, dtype)
            })
            .collect();

        for (name, dtype) in &schema {
            let all_missing = records.iter().all(|r| r.value_or_sentinel(name) == SENTINEL);
            if all_missing {
                warn!(column = %name, "Column contains only missing values");
            }
            debug!(column = %name, dtype = ?dtype, "Detected column type");
        }

        Ok(schema)
    }

    /// Infer a single column's type from its cells.
    ///
    /// Numeric wins over timestamp; a column with no non-sentinel cells is
    /// numeric.
    pub fn infer_column<'a>(&self, values: impl Iterator<Item = &'a str> + Clone) -> ColumnType {
        let present = values.filter(|v| *v != SENTINEL);

        if present.clone().all(|v| parse_numeric(v).is_some()) {
            ColumnType::Numeric
        } else if present.clone().all(|v| parse_timestamp(v).is_some()) {
            ColumnType::Timestamp
        } else {
            ColumnType::Categorical
        }
    }
}
