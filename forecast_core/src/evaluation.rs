//! In-sample replay of the trained model

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::metrics::{mean_squared_error, ErrorMap};
use crate::models::ForecastModel;
use crate::scaling::ScalingCodec;
use ndarray::{s, ArrayView2};
use tracing::debug;

/// Scores one-step predictions over every window against the raw series
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricalEvaluator;

impl HistoricalEvaluator {
    /// Create a new evaluator
    pub fn new() -> Self {
        Self
    }

    /// Predict every window in `inputs`, decode the predictions and compare
    /// prediction `k` with the raw value columns of feature row
    /// `window_size + k`.
    pub fn evaluate(
        &self,
        model: &ForecastModel,
        inputs: ArrayView2<'_, f64>,
        codec: &ScalingCodec,
        table: &FeatureTable,
        window_size: usize,
    ) -> Result<ErrorMap> {
        let windows = inputs.nrows();
        if windows == 0 {
            return Err(ForecastError::InsufficientData(
                "No windows to evaluate".to_string(),
            ));
        }
        if window_size + windows > table.len() {
            return Err(ForecastError::InvalidInput(format!(
                "{} windows of size {} do not fit a table of {} rows",
                windows,
                window_size,
                table.len()
            )));
        }

        let predicted = codec.decode(model.predict(inputs)?.view())?;
        let actual = table.value_matrix()?;
        let actual = actual.slice(s![window_size..window_size + windows, ..]);

        let mut errors = ErrorMap::new();
        for (j, name) in table.value_columns().iter().enumerate() {
            let p = predicted.column(j).to_vec();
            let a = actual.column(j).to_vec();
            errors.insert(name.clone(), mean_squared_error(&p, &a)?);
        }

        debug!(windows, columns = errors.len(), "evaluated historical fit");
        Ok(errors)
    }
}
