//! Histogram gradient boosting for a single regression target

use super::binning::FeatureBinner;
use super::tree::{RegressionTree, TreeGrower, TreeParams};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters of the boosting engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting iterations
    pub max_iter: usize,
    /// Shrinkage applied to every leaf value
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Maximum leaves per tree
    pub max_leaf_nodes: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf values
    pub l2_regularization: f64,
    /// Maximum histogram bins per feature
    pub max_bins: usize,
    /// Share of features considered at each split, in `(0, 1]`
    pub max_features: f64,
    /// Seed for feature subsampling; `None` draws a fresh seed per fit
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            learning_rate: 0.05,
            max_depth: 7,
            max_leaf_nodes: 31,
            min_samples_leaf: 20,
            l2_regularization: 0.0,
            max_bins: 255,
            max_features: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(ForecastError::InvalidInput(
                "max_iter must be positive".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ForecastError::InvalidInput(
                "learning_rate must be positive".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidInput(
                "max_depth must be positive".to_string(),
            ));
        }
        if self.max_leaf_nodes < 2 {
            return Err(ForecastError::InvalidInput(
                "max_leaf_nodes must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidInput(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        if !(self.l2_regularization.is_finite() && self.l2_regularization >= 0.0) {
            return Err(ForecastError::InvalidInput(
                "l2_regularization must be non-negative".to_string(),
            ));
        }
        if !(2..=255).contains(&self.max_bins) {
            return Err(ForecastError::InvalidInput(
                "max_bins must be between 2 and 255".to_string(),
            ));
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(ForecastError::InvalidInput(
                "max_features must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            max_leaf_nodes: self.max_leaf_nodes,
            min_samples_leaf: self.min_samples_leaf,
            l2_regularization: self.l2_regularization,
            max_features: self.max_features,
        }
    }
}

/// Gradient boosted trees with squared-error loss
#[derive(Debug, Clone)]
pub struct HistGradientBoostingRegressor {
    config: GradientBoostingConfig,
    baseline: f64,
    trees: Vec<RegressionTree>,
    n_features: Option<usize>,
}

impl HistGradientBoostingRegressor {
    /// Create an unfitted regressor
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            baseline: 0.0,
            trees: Vec::new(),
            n_features: None,
        }
    }

    /// Number of trees kept by the last fit
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fit from scratch on `x` (one sample per row) and targets `y`.
    ///
    /// Starts from the target mean and stops early once a round produces a
    /// tree with a single leaf.
    pub fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 || x.ncols() == 0 {
            return Err(ForecastError::ModelTraining(
                "Cannot fit on an empty matrix".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(ForecastError::ModelTraining(format!(
                "Got {} samples but {} targets",
                n_samples,
                y.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelTraining(
                "Training data contains non-finite values".to_string(),
            ));
        }

        let baseline = y.sum() / n_samples as f64;
        let binner = FeatureBinner::fit(x, self.config.max_bins);
        let binned = binner.transform(x);
        let grower = TreeGrower::new(&binned, &binner, self.config.tree_params());
        let mut rng = match self.config.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut raw = vec![baseline; n_samples];
        let mut trees = Vec::with_capacity(self.config.max_iter);

        for _ in 0..self.config.max_iter {
            let gradients: Vec<f64> = raw.iter().zip(y.iter()).map(|(p, t)| p - t).collect();
            let (tree, updates) = grower.grow(&gradients, self.config.learning_rate, &mut rng);

            for (prediction, update) in raw.iter_mut().zip(updates) {
                *prediction += update;
            }

            let exhausted = tree.n_leaves() == 1;
            trees.push(tree);
            if exhausted {
                break;
            }
        }

        debug!(
            samples = n_samples,
            features = x.ncols(),
            trees = trees.len(),
            "fitted gradient boosting"
        );

        self.baseline = baseline;
        self.trees = trees;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    /// Predict one value per row of `x`
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let n_features = self.n_features.ok_or_else(|| {
            ForecastError::ModelTraining("Regressor has not been fitted".to_string())
        })?;
        if x.ncols() != n_features {
            return Err(ForecastError::InvalidInput(format!(
                "Expected {} features, got {}",
                n_features,
                x.ncols()
            )));
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.baseline
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};

    fn small_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            max_iter: 100,
            learning_rate: 0.1,
            min_samples_leaf: 2,
            ..GradientBoostingConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = GradientBoostingConfig::default();

        assert_eq!(config.max_iter, 300);
        assert_eq!(config.max_depth, 7);
        assert_eq!(config.random_state, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GradientBoostingConfig {
            learning_rate: 0.0,
            ..GradientBoostingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GradientBoostingConfig {
            max_features: 1.5,
            ..GradientBoostingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_learns_step_function() {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| (i + j) as f64);
        let y: Array1<f64> = (0..60).map(|i| if i < 30 { 1.0 } else { 3.0 }).collect();

        let mut model = HistGradientBoostingRegressor::new(small_config());
        model.fit(x.view(), y.view()).unwrap();
        let predictions = model.predict(x.view()).unwrap();

        assert_abs_diff_eq!(predictions[5], 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(predictions[50], 3.0, epsilon = 0.05);
    }

    #[test]
    fn test_constant_target_stops_early() {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| (i * j) as f64);
        let y = Array1::from_elem(40, 2.5);

        let mut model = HistGradientBoostingRegressor::new(small_config());
        model.fit(x.view(), y.view()).unwrap();

        assert_eq!(model.n_trees(), 1);
        for p in model.predict(x.view()).unwrap() {
            assert_abs_diff_eq!(p, 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = Array2::from_shape_fn((80, 4), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y: Array1<f64> = (0..80).map(|i| ((i % 9) as f64).sqrt()).collect();
        let config = GradientBoostingConfig {
            max_features: 0.5,
            ..small_config()
        };

        let mut first = HistGradientBoostingRegressor::new(config.clone());
        let mut second = HistGradientBoostingRegressor::new(config);
        first.fit(x.view(), y.view()).unwrap();
        second.fit(x.view(), y.view()).unwrap();

        assert_eq!(
            first.predict(x.view()).unwrap(),
            second.predict(x.view()).unwrap()
        );
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = HistGradientBoostingRegressor::new(GradientBoostingConfig::default());
        let x = Array2::zeros((1, 2));

        assert!(matches!(
            model.predict(x.view()),
            Err(ForecastError::ModelTraining(_))
        ));
    }

    #[test]
    fn test_mismatched_targets_fail() {
        let x = Array2::zeros((5, 2));
        let y = Array1::zeros(4);
        let mut model = HistGradientBoostingRegressor::new(GradientBoostingConfig::default());

        assert!(matches!(
            model.fit(x.view(), y.view()),
            Err(ForecastError::ModelTraining(_))
        ));
    }
}
