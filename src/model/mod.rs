//! Reconstruction model
//!
//! A small encoder-decoder network trained to reproduce windows of the
//! scaled feature matrix. Windows it reconstructs poorly are candidates
//! for anomalies.

mod autoencoder;
mod layers;
mod optimizer;
mod recurrent;
mod trainer;

pub use autoencoder::{mse, ReconstructionNetwork};
pub use layers::{BatchNorm, Dense};
pub use optimizer::Adam;
pub use recurrent::{AttentionPool, Gru};
pub use trainer::{EpochMetrics, Trainer, TrainingSummary};
