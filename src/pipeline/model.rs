//! Trained model: everything needed to rescore new records

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{LensError, Result};
use crate::model::ReconstructionNetwork;
use crate::preprocessing::StandardScaler;
use crate::report::{Report, ReportAssembler};
use crate::schema::{FeatureEncoder, RawRecord};
use crate::scoring::{AnomalyScorer, WindowScore};
use crate::sequence::{to_batch, windows_of_length, Sequence};

/// Fitted encoders, scaler, network and threshold of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyModel {
    pub(crate) encoder: FeatureEncoder,
    pub(crate) scaler: StandardScaler,
    pub(crate) network: ReconstructionNetwork,
    pub(crate) scorer: AnomalyScorer,
    pub(crate) window_length: usize,
    pub(crate) config: AnalysisConfig,
}

impl AnomalyModel {
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn threshold(&self) -> f64 {
        self.scorer.threshold()
    }

    /// Largest |error - threshold| of the training pass
    pub fn max_distance(&self) -> f64 {
        self.scorer.max_distance()
    }

    /// Encode and scale records with the fitted encoders and scaler
    pub fn prepare(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        let matrix = self.encoder.transform(records)?;
        self.scaler.transform(&matrix.values)
    }

    /// Windows of the model's length over new records
    pub fn sequences(&self, records: &[RawRecord]) -> Result<Vec<Sequence>> {
        windows_of_length(&self.prepare(records)?, self.window_length)
    }

    /// Reconstruction error of each sequence
    pub fn reconstruction_errors(&self, sequences: &[Sequence]) -> Result<Vec<f64>> {
        if sequences.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(bad) = sequences.iter().find(|s| s.len() != self.window_length) {
            return Err(LensError::Shape {
                expected: format!("windows of {} rows", self.window_length),
                actual: format!("{} rows", bad.len()),
            });
        }
        self.network.window_errors(&to_batch(sequences)?)
    }

    /// Score already-built sequences against the fitted threshold
    pub fn score_sequences(&self, sequences: &[Sequence]) -> Result<Vec<WindowScore>> {
        let errors = self.reconstruction_errors(sequences)?;
        Ok(self.score_errors(sequences, &errors))
    }

    /// Encode, scale, window and score new records
    pub fn score_records(&self, records: &[RawRecord]) -> Result<Vec<WindowScore>> {
        self.score_sequences(&self.sequences(records)?)
    }

    /// Rescore records and assemble a report without retraining
    pub fn report(&self, records: &[RawRecord]) -> Result<Report> {
        let started = std::time::Instant::now();
        let scores = self.score_records(records)?;
        ReportAssembler::new(records, self.encoder.schema())
            .with_start(started)
            .assemble(self.window_length, self.threshold(), &scores)
    }

    pub(crate) fn score_errors(&self, sequences: &[Sequence], errors: &[f64]) -> Vec<WindowScore> {
        sequences
            .iter()
            .zip(errors)
            .map(|(seq, &error)| self.scorer.score_window(seq.start, error))
            .collect()
    }
}
