//! Error types for the loglens pipeline

use thiserror::Error;

/// Result type alias for loglens operations
pub type Result<T> = std::result::Result<T, LensError>;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum LensError {
    /// Rows could not be parsed from the source at all
    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Dataset is empty: no usable rows")]
    EmptyDataset,

    #[error("Insufficient data: {rows} rows, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    /// A column could not be encoded under its fitted strategy
    #[error("Encoding error in column '{column}': {reason}")]
    Encoding { column: String, reason: String },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::prelude::PolarsError> for LensError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        LensError::InputFormat(err.to_string())
    }
}

impl From<serde_json::Error> for LensError {
    fn from(err: serde_json::Error) -> Self {
        LensError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for LensError {
    fn from(err: bincode::Error) -> Self {
        LensError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for LensError {
    fn from(err: ndarray::ShapeError) -> Self {
        LensError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LensError::InsufficientData { rows: 1, required: 2 };
        assert_eq!(err.to_string(), "Insufficient data: 1 rows, at least 2 required");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LensError = io_err.into();
        assert!(matches!(err, LensError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: LensError = json_err.into();
        assert!(matches!(err, LensError::Serialization(_)));
    }
}
