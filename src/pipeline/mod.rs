//! Analysis pipeline and model lifecycle
//!
//! `analyze` trains a model for one dataset and reports on it. The trained
//! [`AnomalyModel`] can be kept with `persist` and brought back with
//! `restore` to score new records.

mod analyzer;
mod model;

pub use analyzer::Analyzer;
pub use model::AnomalyModel;

use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::export::{self, ModelStore};
use crate::report::Report;
use crate::schema::RawRecord;

/// Analyze records with the default configuration
pub fn analyze(records: &[RawRecord]) -> Result<Report> {
    Analyzer::new(AnalysisConfig::default()).analyze(records)
}

/// Serialize a trained model into `store` under `id`
pub fn persist(store: &dyn ModelStore, model: &AnomalyModel, id: &str) -> Result<()> {
    let bytes = export::to_bytes(model)?;
    store.save(id, &bytes)?;
    info!(id, bytes = bytes.len(), "Persisted model");
    Ok(())
}

/// Load the model stored under `id`; `ModelNotFound` if unknown
pub fn restore(store: &dyn ModelStore, id: &str) -> Result<AnomalyModel> {
    let bytes = store.load(id)?;
    let stored = export::from_bytes::<AnomalyModel>(&bytes)?;
    info!(id, created_at = %stored.created_at, "Restored model");
    Ok(stored.model)
}
