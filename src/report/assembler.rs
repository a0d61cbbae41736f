//! Report assembly from window scores and the original records

use std::time::Instant;
use tracing::info;

use super::{AnomalyRecord, Report, Severity, TimeRange};
use crate::error::{LensError, Result};
use crate::model::TrainingSummary;
use crate::schema::{summarize_columns, ColumnProfile, ColumnStats, ColumnType, RawRecord};
use crate::scoring::WindowScore;

/// Added whenever at least one window is flagged
const FLAGGED_RECOMMENDATION: &str =
    "Review the flagged records and correlate them with system events around the same time";

/// Builds a [`Report`] for one dataset
#[derive(Debug, Clone)]
pub struct ReportAssembler<'a> {
    records: &'a [RawRecord],
    schema: Vec<(String, ColumnType)>,
    training: Option<TrainingSummary>,
    started: Option<Instant>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(records: &'a [RawRecord], schema: Vec<(String, ColumnType)>) -> Self {
        Self {
            records,
            schema,
            training: None,
            started: None,
        }
    }

    /// Attach the training summary of the run
    pub fn with_training(mut self, training: TrainingSummary) -> Self {
        self.training = Some(training);
        self
    }

    /// Start of the analysis, for the reported duration
    pub fn with_start(mut self, started: Instant) -> Self {
        self.started = Some(started);
        self
    }

    pub fn assemble(self, window_length: usize, threshold: f64, scores: &[WindowScore]) -> Result<Report> {
        let columns = summarize_columns(self.records, &self.schema);
        let anomalies = self.anomalies(scores)?;
        let recommendations = recommendations(anomalies.len(), &columns);
        let time_range = time_range(&columns);

        let report = Report {
            total_records: self.records.len(),
            total_sequences: scores.len(),
            window_length,
            anomalies_detected: anomalies.len(),
            threshold,
            columns,
            anomalies,
            recommendations,
            anomaly_scores: scores.iter().map(|s| s.score).collect(),
            confidence_scores: scores.iter().map(|s| s.confidence).collect(),
            time_range,
            training: self.training,
            analysis_duration_secs: self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0),
        };

        info!(
            records = report.total_records,
            sequences = report.total_sequences,
            anomalies = report.anomalies_detected,
            high = report.by_severity(Severity::High).count(),
            "Assembled report"
        );
        Ok(report)
    }

    fn anomalies(&self, scores: &[WindowScore]) -> Result<Vec<AnomalyRecord>> {
        let names: Vec<String> = self.schema.iter().map(|(name, _)| name.clone()).collect();

        scores
            .iter()
            .filter(|s| s.is_anomaly)
            .map(|s| {
                let record = self.records.get(s.start).ok_or_else(|| LensError::Shape {
                    expected: format!("row index < {}", self.records.len()),
                    actual: s.start.to_string(),
                })?;
                let severity = Severity::from_score(s.score);
                Ok(AnomalyRecord {
                    index: s.start,
                    score: s.score,
                    confidence: s.confidence,
                    error: s.error,
                    context: record.to_context(&names),
                    severity,
                    recommended_action: severity.recommended_action().to_string(),
                })
            })
            .collect()
    }
}

/// Dataset-level recommendations
pub fn recommendations(flagged: usize, columns: &[ColumnProfile]) -> Vec<String> {
    let mut out = Vec::new();
    if flagged > 0 {
        out.push(FLAGGED_RECOMMENDATION.to_string());
    }

    for profile in columns {
        if let Some((mean, std)) = profile.numeric_moments() {
            // ratio is meaningless for non-positive means
            if mean > 0.0 && std > 2.0 * mean {
                out.push(format!(
                    "Column '{}' is highly variable (std {:.3} exceeds twice the mean {:.3}); check for outliers or mixed units",
                    profile.name, std, mean
                ));
            }
        }
    }
    out
}

fn time_range(columns: &[ColumnProfile]) -> Option<TimeRange> {
    columns.iter().find_map(|profile| match &profile.stats {
        ColumnStats::Timestamp {
            earliest: Some(start),
            latest: Some(end),
            ..
        } => Some(TimeRange {
            column: profile.name.clone(),
            start: start.clone(),
            end: end.clone(),
        }),
        _ => None,
    })
}
