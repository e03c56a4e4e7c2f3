//! Regression backends and the one-step forecast model

use crate::error::{ForecastError, Result};
use crate::window::WindowedDataset;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::fmt::Debug;
use std::time::Instant;
use tracing::info;

pub mod binning;
pub mod gradient_boosting;
pub mod multi_output;
pub mod tree;

pub use gradient_boosting::{GradientBoostingConfig, HistGradientBoostingRegressor};
pub use multi_output::MultiOutputRegressor;

/// Multi-output regression capability
pub trait Regressor: Debug + Send + Sync {
    /// Fit from scratch; one sample per row of `inputs`, one target row per sample
    fn train(&mut self, inputs: ArrayView2<'_, f64>, targets: ArrayView2<'_, f64>) -> Result<()>;

    /// Predict one target row per input row
    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Name of the regressor
    fn name(&self) -> &str;
}

/// One-step-ahead model over flattened windows
#[derive(Debug)]
pub struct ForecastModel {
    regressor: Box<dyn Regressor>,
    input_width: Option<usize>,
    outputs: usize,
}

impl ForecastModel {
    /// Wrap any regressor
    pub fn new(regressor: Box<dyn Regressor>) -> Self {
        Self {
            regressor,
            input_width: None,
            outputs: 0,
        }
    }

    /// Model backed by the default boosted-tree regressor
    pub fn gradient_boosting(config: GradientBoostingConfig) -> Self {
        Self::new(Box::new(MultiOutputRegressor::new(config)))
    }

    /// Name of the underlying regressor
    pub fn name(&self) -> &str {
        self.regressor.name()
    }

    /// Check if [`ForecastModel::train`] has succeeded
    pub fn is_trained(&self) -> bool {
        self.input_width.is_some()
    }

    /// Train on the chronological training prefix of `dataset`.
    ///
    /// Every failure is reported as [`ForecastError::ModelTraining`].
    pub fn train(&mut self, dataset: &WindowedDataset) -> Result<()> {
        let (inputs, targets) = dataset.train_split();
        if inputs.nrows() == 0 {
            return Err(ForecastError::ModelTraining(format!(
                "No training windows out of {} windows",
                dataset.len()
            )));
        }

        let started = Instant::now();
        self.regressor
            .train(inputs, targets)
            .map_err(|err| match err {
                ForecastError::ModelTraining(_) => err,
                other => ForecastError::ModelTraining(other.to_string()),
            })?;

        self.input_width = Some(inputs.ncols());
        self.outputs = targets.ncols();

        info!(
            model = self.regressor.name(),
            train_windows = inputs.nrows(),
            input_width = inputs.ncols(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trained forecast model"
        );
        Ok(())
    }

    /// Predict one row of value columns per input window
    pub fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let width = self.input_width.ok_or_else(|| {
            ForecastError::ModelTraining("Model has not been trained".to_string())
        })?;
        if inputs.ncols() != width {
            return Err(ForecastError::InvalidInput(format!(
                "Expected windows of width {}, got {}",
                width,
                inputs.ncols()
            )));
        }

        let predictions = self.regressor.predict(inputs)?;
        if predictions.dim() != (inputs.nrows(), self.outputs) {
            return Err(ForecastError::ModelTraining(format!(
                "Regressor returned shape {:?}, expected ({}, {})",
                predictions.dim(),
                inputs.nrows(),
                self.outputs
            )));
        }
        Ok(predictions)
    }

    /// Predict the next row for a single flattened window
    pub fn predict_one(&self, window: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let predictions = self.predict(window.insert_axis(Axis(0)))?;
        Ok(predictions.row(0).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowedDatasetBuilder;

    /// Predicts the last value-column row of each window
    #[derive(Debug, Default)]
    struct Persistence {
        width: usize,
        outputs: usize,
    }

    impl Regressor for Persistence {
        fn train(
            &mut self,
            inputs: ArrayView2<'_, f64>,
            targets: ArrayView2<'_, f64>,
        ) -> Result<()> {
            self.width = inputs.ncols();
            self.outputs = targets.ncols();
            Ok(())
        }

        fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            let start = self.width - 2;
            Ok(inputs.slice(ndarray::s![.., start..start + self.outputs]).to_owned())
        }

        fn name(&self) -> &str {
            "persistence"
        }
    }

    fn dataset(rows: usize) -> WindowedDataset {
        let matrix = Array2::from_shape_fn((rows, 2), |(i, j)| (i + j) as f64);
        WindowedDatasetBuilder::new(3, 1).unwrap().build(&matrix).unwrap()
    }

    #[test]
    fn test_custom_regressor() {
        let mut model = ForecastModel::new(Box::new(Persistence::default()));
        model.train(&dataset(10)).unwrap();

        assert!(model.is_trained());
        assert_eq!(model.name(), "persistence");

        let window = Array1::from(vec![0.0, 1.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(model.predict_one(window.view()).unwrap().to_vec(), vec![2.0]);
    }

    #[test]
    fn test_no_training_windows() {
        // one window: floor(0.8 * 1) = 0 training windows
        let mut model = ForecastModel::new(Box::new(Persistence::default()));

        assert!(matches!(
            model.train(&dataset(4)),
            Err(ForecastError::ModelTraining(_))
        ));
    }

    #[test]
    fn test_predict_before_train() {
        let model = ForecastModel::gradient_boosting(GradientBoostingConfig::default());

        assert!(matches!(
            model.predict(Array2::zeros((1, 6)).view()),
            Err(ForecastError::ModelTraining(_))
        ));
    }

    #[test]
    fn test_backend_errors_become_training_errors() {
        let mut model = ForecastModel::gradient_boosting(GradientBoostingConfig {
            learning_rate: -1.0,
            ..GradientBoostingConfig::default()
        });

        assert!(matches!(
            model.train(&dataset(20)),
            Err(ForecastError::ModelTraining(_))
        ));
    }
}
