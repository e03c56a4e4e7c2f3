//! # Series Math
//!
//! Rolling-window calculations over numeric series.
//! These are the building blocks for the lag and moving-average features
//! derived by `forecast_core`.
//!
//! Every batch helper returns one slot per input value. Slots that do not
//! have enough history yet are `None`, so callers can line derived columns up
//! with the original rows and drop the incomplete ones afterwards.
//!
//! ```
//! use series_math::moving_averages::rolling_mean;
//!
//! let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
//! assert_eq!(means, vec![None, None, Some(2.0), Some(3.0)]);
//! ```

use thiserror::Error;

pub mod differences;
pub mod moving_averages;

/// Errors that can occur in rolling-window calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = MathError::InvalidInput("period must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid input: period must be greater than zero"
        );
    }
}
