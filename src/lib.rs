//! loglens - Reconstruction-based anomaly detection for tabular logs
//!
//! This crate ingests tabular/log data of unknown schema and flags anomalous
//! rows with a self-supervised sequence-reconstruction model:
//! - Schema inference and numeric encoding of raw text columns
//! - Column-wise standardization and sliding windows
//! - An encoder-decoder network trained to reproduce the windows
//! - Percentile thresholding, logistic scores and confidence
//! - A structured report with severities and recommendations
//!
//! # Modules
//!
//! ## Core
//! - [`schema`] - Column type detection, encoding, column statistics
//! - [`preprocessing`] - Feature scaling
//! - [`sequence`] - Sliding windows over the feature matrix
//! - [`model`] - Reconstruction network, optimizer and training loop
//! - [`scoring`] - Threshold, score and confidence
//! - [`report`] - Report assembly
//! - [`pipeline`] - `analyze`, `persist` and `restore`
//!
//! ## Supporting
//! - [`export`] - Model stores and the persisted envelope
//! - [`utils`] - CSV loading
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use loglens::prelude::*;
//!
//! let records = DataLoader::new().load_csv("auth.csv")?;
//! let (model, report) = Analyzer::new(AnalysisConfig::default()).fit(&records)?;
//! println!("{} anomalies", report.anomalies_detected);
//!
//! let store = InMemoryStore::new();
//! persist(&store, &model, "auth-daily")?;
//! let restored = restore(&store, "auth-daily")?;
//! let scores = restored.score_records(&records)?;
//! # Ok::<(), loglens::LensError>(())
//! ```

// Core error handling and configuration
pub mod error;
pub mod config;

// Core pipeline stages
pub mod schema;
pub mod preprocessing;
pub mod sequence;
pub mod model;
pub mod scoring;
pub mod report;
pub mod pipeline;

// Persistence and I/O
pub mod export;
pub mod utils;

// Services
pub mod cli;

pub use error::{LensError, Result};
pub use pipeline::{analyze, persist, restore, AnomalyModel, Analyzer};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{LensError, Result};

    // Configuration
    pub use crate::config::{AnalysisConfig, ModelConfig};

    // Schema
    pub use crate::schema::{ColumnProfile, ColumnStats, ColumnType, FeatureEncoder, FeatureMatrix, RawRecord, SENTINEL};

    // Stages
    pub use crate::preprocessing::StandardScaler;
    pub use crate::sequence::{Sequence, SequenceWindower};
    pub use crate::model::{ReconstructionNetwork, Trainer, TrainingSummary};
    pub use crate::scoring::{AnomalyScorer, ConfidenceEstimator, WindowScore};

    // Report
    pub use crate::report::{AnomalyRecord, Report, Severity, TimeRange};

    // Pipeline
    pub use crate::pipeline::{analyze, persist, restore, AnomalyModel, Analyzer};

    // Persistence and loading
    pub use crate::export::{DirectoryStore, InMemoryStore, ModelStore};
    pub use crate::utils::DataLoader;
}
