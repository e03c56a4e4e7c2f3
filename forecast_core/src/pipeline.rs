//! End-to-end forecast for one request
//!
//! A pipeline owns no state between runs: every call to
//! [`ForecastPipeline::run`] builds its own codec and model.

use crate::data::{TimeSeries, TimeSeriesNormalizer};
use crate::error::{ForecastError, Result};
use crate::evaluation::HistoricalEvaluator;
use crate::features::FeatureBuilder;
use crate::metrics::ErrorMap;
use crate::models::{ForecastModel, GradientBoostingConfig, Regressor};
use crate::projection::{ForecastResult, RecursiveProjector};
use crate::scaling::ScalingCodec;
use crate::utils::{detect_granularity, future_timestamps};
use crate::window::{window_size, WindowedDatasetBuilder};
use chrono::Duration;
use ndarray::s;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{info, info_span};

/// Largest number of future periods a single run may project
pub const MAX_PERIODS: usize = 100_000;

/// Builds a fresh regressor for each run
pub type RegressorFactory = Box<dyn Fn() -> Box<dyn Regressor> + Send + Sync>;

/// Request parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastParams {
    /// Number of future periods to project
    pub n_periods: usize,
    /// Share of the series used as the window length
    pub analysis_ratio: f64,
}

impl ForecastParams {
    /// Validate raw request values
    pub fn new(n_periods: i64, analysis_ratio: f64) -> Result<Self> {
        let n_periods = usize::try_from(n_periods).map_err(|_| {
            ForecastError::InvalidInput(format!(
                "Number of periods must be non-negative, got {}",
                n_periods
            ))
        })?;

        let params = Self {
            n_periods,
            analysis_ratio,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that the analysis ratio is a positive finite number and the
    /// horizon stays within [`MAX_PERIODS`]
    pub fn validate(&self) -> Result<()> {
        if self.n_periods > MAX_PERIODS {
            return Err(ForecastError::InvalidInput(format!(
                "Number of periods must be at most {}, got {}",
                MAX_PERIODS, self.n_periods
            )));
        }
        if !(self.analysis_ratio.is_finite() && self.analysis_ratio > 0.0) {
            return Err(ForecastError::InvalidInput(format!(
                "Analysis ratio must be a positive number, got {}",
                self.analysis_ratio
            )));
        }
        Ok(())
    }
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// Historical MSE per value column
    pub errors: ErrorMap,
    /// Projected periods
    pub forecast: ForecastResult,
    /// Rows per input window
    pub window_size: usize,
    /// Median spacing of the input series
    pub granularity: Duration,
    /// Number of windows built from the series
    pub windows: usize,
}

/// Normalize, featurize, train, evaluate and project
pub struct ForecastPipeline {
    params: ForecastParams,
    model_config: GradientBoostingConfig,
    factory: Option<RegressorFactory>,
}

impl fmt::Debug for ForecastPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastPipeline")
            .field("params", &self.params)
            .field("model_config", &self.model_config)
            .field("custom_regressor", &self.factory.is_some())
            .finish()
    }
}

impl ForecastPipeline {
    /// Create a pipeline using the default boosted-tree model
    pub fn new(params: ForecastParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            model_config: GradientBoostingConfig::default(),
            factory: None,
        })
    }

    /// Use a different boosting configuration
    pub fn with_model_config(mut self, config: GradientBoostingConfig) -> Self {
        self.model_config = config;
        self
    }

    /// Use a custom regressor; `factory` is called once per run
    pub fn with_regressor<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Regressor> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Get the request parameters
    pub fn params(&self) -> &ForecastParams {
        &self.params
    }

    /// Run on raw row objects
    pub fn run(&self, records: &[Value]) -> Result<ForecastOutcome> {
        let series = TimeSeriesNormalizer::new().normalize(records)?;
        self.run_series(&series)
    }

    /// Run on an already canonical series
    pub fn run_series(&self, series: &TimeSeries) -> Result<ForecastOutcome> {
        let span = info_span!("forecast", rows = series.len(), horizon = self.params.n_periods);
        let _enter = span.enter();

        let granularity = detect_granularity(series.timestamps())?;
        let last_timestamp = series.last_timestamp().ok_or_else(|| {
            ForecastError::InsufficientData("Series has no rows".to_string())
        })?;
        let timestamps = future_timestamps(last_timestamp, self.params.n_periods, granularity)?;
        let window = window_size(series.len(), self.params.analysis_ratio);

        let table = FeatureBuilder::new().build(series)?;
        let n_values = table.value_columns().len();
        let raw = table.to_matrix()?;
        let codec = ScalingCodec::fit(&raw, n_values)?;
        let normalized = codec.encode(&raw)?;

        let dataset = WindowedDatasetBuilder::new(window, n_values)?.build(&normalized)?;

        let mut model = self.model();
        model.train(&dataset)?;

        let errors = HistoricalEvaluator::new().evaluate(
            &model,
            dataset.inputs(),
            &codec,
            &table,
            window,
        )?;

        let last_window = normalized.slice(s![normalized.nrows() - window.., ..]);
        let forecast = RecursiveProjector::new(&model, &codec).project(
            last_window,
            timestamps,
            table.value_columns(),
        )?;

        info!(
            window_size = window,
            windows = dataset.len(),
            granularity_secs = granularity.num_seconds(),
            "forecast complete"
        );

        Ok(ForecastOutcome {
            errors,
            forecast,
            window_size: window,
            granularity,
            windows: dataset.len(),
        })
    }

    fn model(&self) -> ForecastModel {
        match &self.factory {
            Some(factory) => ForecastModel::new(factory()),
            None => ForecastModel::gradient_boosting(self.model_config.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1, 0.5)]
    #[case(3, 0.0)]
    #[case(3, -0.2)]
    #[case(3, f64::NAN)]
    #[case(100_001, 0.5)]
    #[case(1_000_000_000_000, 0.5)]
    fn test_invalid_params(#[case] n_periods: i64, #[case] ratio: f64) {
        assert!(matches!(
            ForecastParams::new(n_periods, ratio),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_zero_periods_allowed() {
        let params = ForecastParams::new(0, 0.3).unwrap();
        assert_eq!(params.n_periods, 0);
        assert!(ForecastPipeline::new(params).is_ok());
        assert!(ForecastParams::new(MAX_PERIODS as i64, 0.3).is_ok());
    }

    #[test]
    fn test_pipeline_rejects_unvalidated_params() {
        let params = ForecastParams {
            n_periods: 1,
            analysis_ratio: f64::INFINITY,
        };
        assert!(ForecastPipeline::new(params).is_err());
    }
}
