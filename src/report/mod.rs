//! Analysis report
//!
//! The report joins flagged windows back to their source rows and adds
//! dataset-level column profiles and recommendations.

mod assembler;

pub use assembler::ReportAssembler;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::model::TrainingSummary;
use crate::schema::ColumnProfile;

/// Severity tier of an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    /// `High` above a score of 0.8, `Medium` otherwise
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Severity::High
        } else {
            Severity::Medium
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            Severity::High => {
                "Investigate immediately: review the surrounding events and isolate the affected source"
            }
            Severity::Medium => "Monitor: review the record and watch for recurring patterns",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flagged window, represented by its first source row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Source row index (the window's start)
    pub index: usize,
    pub score: f64,
    pub confidence: f64,
    /// Raw reconstruction error of the window
    pub error: f64,
    /// Full original record, string-valued
    pub context: BTreeMap<String, String>,
    pub severity: Severity,
    pub recommended_action: String,
}

/// Span of the dataset's first timestamp column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub column: String,
    pub start: String,
    pub end: String,
}

/// Structured result of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total_records: usize,
    pub total_sequences: usize,
    pub window_length: usize,
    pub anomalies_detected: usize,
    pub threshold: f64,
    pub columns: Vec<ColumnProfile>,
    pub anomalies: Vec<AnomalyRecord>,
    pub recommendations: Vec<String>,
    /// Per-window scores, ordered by window start
    pub anomaly_scores: Vec<f64>,
    /// Per-window confidences, ordered by window start
    pub confidence_scores: Vec<f64>,
    pub time_range: Option<TimeRange>,
    pub training: Option<TrainingSummary>,
    pub analysis_duration_secs: f64,
}

impl Report {
    /// Anomalies at the given severity
    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &AnomalyRecord> {
        self.anomalies.iter().filter(move |a| a.severity == severity)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
