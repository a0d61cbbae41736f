//! Schema inference and feature encoding
//!
//! Turns rows of raw textual tokens into a numeric feature matrix:
//! - Per-column type detection (numeric, timestamp, categorical)
//! - Label encoding of categorical columns in first-seen order
//! - Descriptive column statistics for reporting

mod detector;
mod encoder;
mod summary;

pub use detector::{parse_timestamp, SchemaDetector};
pub use encoder::{ColumnEncoder, ColumnSpec, FeatureEncoder, FeatureMatrix};
pub use summary::{summarize_columns, ColumnProfile, ColumnStats, ValueCount};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Token used for missing cells
pub const SENTINEL: &str = "UNKNOWN";

/// Inferred column type, resolved once per column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Timestamp,
    Categorical,
}

/// One input row: an ordered mapping from column name to raw token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, replacing any previous value for the column
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Builder form of [`RawRecord::insert`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Cell value, or the sentinel when the column is absent
    pub fn value_or_sentinel(&self, column: &str) -> &str {
        self.get(column).unwrap_or(SENTINEL)
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Full string-valued view of the record over the given columns
    pub fn to_context(&self, columns: &[String]) -> BTreeMap<String, String> {
        columns
            .iter()
            .map(|c| (c.clone(), self.value_or_sentinel(c).to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Union of column names across records, ordered by first appearance
pub fn column_names(records: &[RawRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for record in records {
        for column in record.columns() {
            if seen.insert(column) {
                names.push(column.to_string());
            }
        }
    }
    names
}
