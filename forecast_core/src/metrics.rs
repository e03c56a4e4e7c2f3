//! Error metrics for historical fit

use crate::error::{ForecastError, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// Mean squared error between predicted and actual values
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    if predicted.len() != actual.len() || predicted.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Predicted and actual values must have the same non-zero length".to_string(),
        ));
    }

    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();

    Ok(sum / predicted.len() as f64)
}

/// Per-column MSE, in value-column order.
///
/// Serializes as a JSON object keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap {
    entries: IndexMap<String, f64>,
}

impl ErrorMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error of a column, replacing any previous value in place
    pub fn insert(&mut self, column: impl Into<String>, error: f64) {
        self.entries.insert(column.into(), error);
    }

    /// Error of one column
    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries.get(column).copied()
    }

    /// Iterate over `(column, error)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, error)| (name.as_str(), *error))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_squared_error() {
        let mse = mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 4.0, 0.0]).unwrap();
        assert_relative_eq!(mse, 13.0 / 3.0);

        assert!(mean_squared_error(&[], &[]).is_err());
        assert!(mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_error_map_keeps_insertion_order() {
        let mut errors = ErrorMap::new();
        errors.insert("b", 2.0);
        errors.insert("a", 1.0);
        errors.insert("b", 3.0);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("b"), Some(3.0));
        assert_eq!(
            serde_json::to_string(&errors).unwrap(),
            r#"{"b":3.0,"a":1.0}"#
        );
    }
}
