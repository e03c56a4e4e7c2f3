//! One independent boosted model per target column

use super::gradient_boosting::{GradientBoostingConfig, HistGradientBoostingRegressor};
use super::Regressor;
use crate::error::{ForecastError, Result};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Multi-output adapter around [`HistGradientBoostingRegressor`]
#[derive(Debug, Clone)]
pub struct MultiOutputRegressor {
    name: String,
    config: GradientBoostingConfig,
    estimators: Vec<HistGradientBoostingRegressor>,
}

impl MultiOutputRegressor {
    /// Create an untrained adapter; every target gets the same configuration
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            name: format!(
                "MultiOutput HistGradientBoosting (max_iter={}, learning_rate={})",
                config.max_iter, config.learning_rate
            ),
            config,
            estimators: Vec::new(),
        }
    }

    /// Fitted per-target estimators, in target column order
    pub fn estimators(&self) -> &[HistGradientBoostingRegressor] {
        &self.estimators
    }
}

impl Regressor for MultiOutputRegressor {
    fn train(&mut self, inputs: ArrayView2<'_, f64>, targets: ArrayView2<'_, f64>) -> Result<()> {
        if targets.ncols() == 0 {
            return Err(ForecastError::ModelTraining(
                "At least one target column is required".to_string(),
            ));
        }

        let config = &self.config;
        self.estimators = (0..targets.ncols())
            .into_par_iter()
            .map(|j| -> Result<HistGradientBoostingRegressor> {
                let mut estimator = HistGradientBoostingRegressor::new(config.clone());
                estimator.fit(inputs, targets.column(j))?;
                Ok(estimator)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(targets = self.estimators.len(), "trained multi-output regressor");

        Ok(())
    }

    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if self.estimators.is_empty() {
            return Err(ForecastError::ModelTraining(
                "Regressor has not been trained".to_string(),
            ));
        }

        let mut predictions = Array2::zeros((inputs.nrows(), self.estimators.len()));
        for (j, estimator) in self.estimators.iter().enumerate() {
            predictions.column_mut(j).assign(&estimator.predict(inputs)?);
        }
        Ok(predictions)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_one_estimator_per_target() {
        let x = Array2::from_shape_fn((50, 3), |(i, j)| (i + 2 * j) as f64);
        let y = Array2::from_shape_fn((50, 2), |(i, j)| if j == 0 { 4.0 } else { i as f64 / 10.0 });
        let config = GradientBoostingConfig {
            max_iter: 50,
            min_samples_leaf: 2,
            learning_rate: 0.2,
            ..GradientBoostingConfig::default()
        };

        let mut model = MultiOutputRegressor::new(config);
        model.train(x.view(), y.view()).unwrap();
        let predictions = model.predict(x.view()).unwrap();

        assert_eq!(model.estimators().len(), 2);
        assert_eq!(predictions.dim(), (50, 2));
        assert_abs_diff_eq!(predictions[[10, 0]], 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(predictions[[40, 1]], 4.0, epsilon = 0.1);
    }

    #[test]
    fn test_predict_untrained_fails() {
        let model = MultiOutputRegressor::new(GradientBoostingConfig::default());

        assert!(model.predict(Array2::zeros((1, 3)).view()).is_err());
    }
}
