//! Analysis configuration

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{LensError, Result};

/// Configuration of the reconstruction model and its training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of the recurrent state and of the per-step decoder stage
    pub hidden_dim: usize,

    /// Size of the latent vector a window is compressed to
    pub latent_dim: usize,

    /// Dropout rate applied after hidden stages during training
    pub dropout: f64,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Fixed number of training epochs
    pub epochs: usize,

    /// Mini-batch size
    pub batch_size: usize,

    /// Fraction of windows held out for validation monitoring
    pub validation_split: f64,

    /// L2 weight decay
    pub weight_decay: f64,

    /// Momentum for the normalization running statistics
    pub norm_momentum: f64,

    /// Random seed for reproducibility
    pub random_state: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 32,
            latent_dim: 16,
            dropout: 0.2,
            learning_rate: 0.001,
            epochs: 30,
            batch_size: 32,
            validation_split: 0.1,
            weight_decay: 0.0001,
            norm_momentum: 0.1,
            random_state: Some(42),
        }
    }
}

impl ModelConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 {
            return Err(invalid("hidden_dim", self.hidden_dim, "must be positive"));
        }
        if self.latent_dim == 0 {
            return Err(invalid("latent_dim", self.latent_dim, "must be positive"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(invalid("dropout", self.dropout, "must be in [0, 1)"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", self.learning_rate, "must be positive"));
        }
        if self.epochs == 0 {
            return Err(invalid("epochs", self.epochs, "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", self.batch_size, "must be positive"));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(invalid("validation_split", self.validation_split, "must be in [0, 1)"));
        }
        if self.weight_decay < 0.0 {
            return Err(invalid("weight_decay", self.weight_decay, "must be non-negative"));
        }
        if !(self.norm_momentum > 0.0 && self.norm_momentum <= 1.0) {
            return Err(invalid("norm_momentum", self.norm_momentum, "must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on the window length; the effective length also
    /// depends on the row count
    pub max_window: usize,

    /// Reconstruction model settings
    pub model: ModelConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_window: 10,
            model: ModelConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            LensError::Config(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| LensError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the maximum window length
    pub fn with_max_window(mut self, max_window: usize) -> Self {
        self.max_window = max_window;
        self
    }

    /// Builder method to set the number of training epochs
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.model.epochs = epochs;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.model.random_state = Some(seed);
        self
    }

    /// Builder method to replace the model configuration
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_window == 0 {
            return Err(invalid("max_window", self.max_window, "must be positive"));
        }
        self.model.validate()
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> LensError {
    LensError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_window, 10);
        assert_eq!(config.model.random_state, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = AnalysisConfig::new()
            .with_max_window(4)
            .with_epochs(5)
            .with_random_state(7);

        assert_eq!(config.max_window, 4);
        assert_eq!(config.model.epochs, 5);
        assert_eq!(config.model.random_state, Some(7));
    }

    #[test]
    fn test_invalid_dropout_rejected() {
        let model = ModelConfig {
            dropout: 1.5,
            ..Default::default()
        };
        let config = AnalysisConfig::new().with_model(model);
        assert!(matches!(config.validate(), Err(LensError::InvalidParameter { .. })));
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = AnalysisConfig::new().with_max_window(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_window": 3, "model": {{"epochs": 7}}}}"#).unwrap();

        let config = AnalysisConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_window, 3);
        assert_eq!(config.model.epochs, 7);
        assert_eq!(config.model.hidden_dim, 32);
    }
}
