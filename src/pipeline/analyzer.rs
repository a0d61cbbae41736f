//! End-to-end analysis: encode, scale, window, train, score, report

use std::time::Instant;
use tracing::{info, warn};

use super::model::AnomalyModel;
use crate::config::AnalysisConfig;
use crate::error::{LensError, Result};
use crate::model::Trainer;
use crate::preprocessing::StandardScaler;
use crate::report::{Report, ReportAssembler};
use crate::schema::{FeatureEncoder, RawRecord};
use crate::scoring::AnomalyScorer;
use crate::sequence::{to_batch, windows_of_length, SequenceWindower};

/// Runs the anomaly-detection pipeline over a dataset
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Train a fresh model on `records` and report on the same records
    pub fn fit(&self, records: &[RawRecord]) -> Result<(AnomalyModel, Report)> {
        let started = Instant::now();
        self.config.validate()?;
        if records.is_empty() {
            return Err(LensError::EmptyDataset);
        }
        info!(records = records.len(), "Starting analysis");

        let (encoder, matrix) = FeatureEncoder::fit_transform(records)?;
        if matrix.ncols() == 0 {
            warn!("Records carry no columns");
            return Err(LensError::EmptyDataset);
        }
        let (scaler, scaled) = StandardScaler::fit_transform(&matrix.values)?;

        let window_length = SequenceWindower::new(self.config.max_window).window_length(scaled.nrows())?;
        let sequences = windows_of_length(&scaled, window_length)?;
        let batch = to_batch(&sequences)?;

        let (network, training) = Trainer::new(self.config.model.clone()).fit(&batch, window_length, matrix.ncols())?;
        let errors = network.window_errors(&batch)?;
        let scorer = AnomalyScorer::fit(&errors)?;

        let model = AnomalyModel {
            encoder,
            scaler,
            network,
            scorer,
            window_length,
            config: self.config.clone(),
        };
        let scores = model.score_errors(&sequences, &errors);

        let report = ReportAssembler::new(records, model.encoder.schema())
            .with_training(training)
            .with_start(started)
            .assemble(window_length, model.threshold(), &scores)?;

        info!(
            window = window_length,
            sequences = report.total_sequences,
            anomalies = report.anomalies_detected,
            elapsed_secs = report.analysis_duration_secs,
            "Analysis complete"
        );
        Ok((model, report))
    }

    /// Analyze records and discard the trained model
    pub fn analyze(&self, records: &[RawRecord]) -> Result<Report> {
        self.fit(records).map(|(_, report)| report)
    }
}
