//! Descriptive statistics over the original (unencoded) records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::detector::{parse_numeric, parse_timestamp};
use super::{ColumnType, RawRecord, SENTINEL};

/// Number of most frequent values kept for categorical columns
const TOP_VALUES: usize = 5;

/// A category and how often it occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Column statistics, by column type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric {
        count: usize,
        mean: Option<f64>,
        /// Sample standard deviation (ddof = 1)
        std: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Categorical {
        unique_count: usize,
        top_values: Vec<ValueCount>,
    },
    Timestamp {
        count: usize,
        earliest: Option<String>,
        latest: Option<String>,
    },
}

/// Reporting profile of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub column_type: ColumnType,
    /// Cells holding the missing-value sentinel
    pub missing: usize,
    pub stats: ColumnStats,
}

impl ColumnProfile {
    /// Mean and standard deviation, for numeric columns
    pub fn numeric_moments(&self) -> Option<(f64, f64)> {
        match self.stats {
            ColumnStats::Numeric {
                mean: Some(mean),
                std: Some(std),
                ..
            } => Some((mean, std)),
            _ => None,
        }
    }
}

/// Profile every column of the schema from the raw records
pub fn summarize_columns(records: &[RawRecord], schema: &[(String, ColumnType)]) -> Vec<ColumnProfile> {
    schema
        .iter()
        .map(|(name, dtype)| {
            let cells: Vec<&str> = records.iter().map(|r| r.value_or_sentinel(name)).collect();
            let missing = cells.iter().filter(|v| **v == SENTINEL).count();
            let present = cells.iter().copied().filter(|v| *v != SENTINEL);

            let stats = match dtype {
                ColumnType::Numeric => numeric_stats(present.filter_map(parse_numeric).collect()),
                ColumnType::Timestamp => timestamp_stats(present.filter_map(parse_timestamp).collect()),
                ColumnType::Categorical => categorical_stats(present),
            };

            ColumnProfile {
                name: name.clone(),
                column_type: *dtype,
                missing,
                stats,
            }
        })
        .collect()
}

fn numeric_stats(values: Vec<f64>) -> ColumnStats {
    let count = values.len();
    if count == 0 {
        return ColumnStats::Numeric {
            count,
            mean: None,
            std: None,
            min: None,
            max: None,
        };
    }

    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if count > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    ColumnStats::Numeric {
        count,
        mean: Some(mean),
        std: Some(std),
        min: Some(min),
        max: Some(max),
    }
}

fn categorical_stats<'a>(values: impl Iterator<Item = &'a str>) -> ColumnStats {
    // first-seen order doubles as the tie-breaker
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        let count = counts.entry(v).or_insert(0);
        if *count == 0 {
            order.push(v);
        }
        *count += 1;
    }

    let mut ranked: Vec<ValueCount> = order
        .iter()
        .map(|v| ValueCount {
            value: v.to_string(),
            count: counts[v],
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_VALUES);

    ColumnStats::Categorical {
        unique_count: order.len(),
        top_values: ranked,
    }
}

fn timestamp_stats(epochs: Vec<i64>) -> ColumnStats {
    let format = |secs: i64| DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339());
    ColumnStats::Timestamp {
        count: epochs.len(),
        earliest: epochs.iter().min().and_then(|&s| format(s)),
        latest: epochs.iter().max().and_then(|&s| format(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(column: &str, values: &[&str]) -> Vec<RawRecord> {
        values.iter().map(|v| RawRecord::new().with(column, *v)).collect()
    }

    #[test]
    fn test_numeric_stats_exclude_sentinel() {
        let data = records("x", &["1", "2", "3", "UNKNOWN"]);
        let profiles = summarize_columns(&data, &[("x".to_string(), ColumnType::Numeric)]);

        assert_eq!(profiles[0].missing, 1);
        match &profiles[0].stats {
            ColumnStats::Numeric { count, mean, std, min, max } => {
                assert_eq!(*count, 3);
                assert_eq!(*mean, Some(2.0));
                assert!((std.unwrap() - 1.0).abs() < 1e-12);
                assert_eq!(*min, Some(1.0));
                assert_eq!(*max, Some(3.0));
            }
            other => panic!("unexpected stats: {:?}", other),
        }
    }

    #[test]
    fn test_top_values_tie_break_first_seen() {
        let data = records("c", &["b", "a", "c", "a", "b", "d", "e", "f", "UNKNOWN"]);
        let profiles = summarize_columns(&data, &[("c".to_string(), ColumnType::Categorical)]);

        match &profiles[0].stats {
            ColumnStats::Categorical { unique_count, top_values } => {
                assert_eq!(*unique_count, 6);
                let order: Vec<&str> = top_values.iter().map(|v| v.value.as_str()).collect();
                assert_eq!(order, vec!["b", "a", "c", "d", "e"]);
                assert_eq!(top_values[0].count, 2);
            }
            other => panic!("unexpected stats: {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_range() {
        let data = records("ts", &["1970-01-01 00:01:00", "1970-01-01 00:00:00"]);
        let profiles = summarize_columns(&data, &[("ts".to_string(), ColumnType::Timestamp)]);

        match &profiles[0].stats {
            ColumnStats::Timestamp { count, earliest, latest } => {
                assert_eq!(*count, 2);
                assert_eq!(earliest.as_deref(), Some("1970-01-01T00:00:00+00:00"));
                assert_eq!(latest.as_deref(), Some("1970-01-01T00:01:00+00:00"));
            }
            other => panic!("unexpected stats: {:?}", other),
        }
    }

    #[test]
    fn test_single_value_std_is_zero() {
        let data = records("x", &["5"]);
        let profiles = summarize_columns(&data, &[("x".to_string(), ColumnType::Numeric)]);
        assert_eq!(profiles[0].numeric_moments(), Some((5.0, 0.0)));
    }
}
