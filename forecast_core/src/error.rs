//! Error types for the forecast_core crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the forecast_core crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Empty or malformed series, unparseable timestamps, no numeric columns
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Too few rows to derive features or to build a single window
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The regression backend could not be fitted or queried
    #[error("Model training error: {0}")]
    ModelTraining(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from reading CSV input
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from decoding JSON input
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from matrix reshaping
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl ForecastError {
    /// Whether the failure was caused by the caller's data rather than by
    /// the service itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InvalidInput(_)
                | ForecastError::InsufficientData(_)
                | ForecastError::CsvError(_)
                | ForecastError::JsonError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            MathError::InvalidInput(msg) => ForecastError::InvalidInput(msg),
        }
    }
}
