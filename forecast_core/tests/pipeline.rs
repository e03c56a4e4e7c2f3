use approx::assert_abs_diff_eq;
use chrono::{Duration, TimeZone, Utc};
use forecast_core::{
    ForecastError, ForecastParams, ForecastPipeline, GradientBoostingConfig, Regressor, Result,
    MAX_PERIODS,
};
use ndarray::{s, Array2, ArrayView2};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// Helper function to build hourly rows with three value columns
fn hourly_rows(n: usize) -> Vec<Value> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            json!({
                "timestamp": (start + Duration::hours(i as i64)).to_rfc3339(),
                "load": 50.0 + 10.0 * (t / 6.0).sin(),
                "temperature": 20.0 + 0.05 * t,
                "humidity": 60.0 + 5.0 * (t / 4.0).cos(),
            })
        })
        .collect()
}

fn fast_config() -> GradientBoostingConfig {
    GradientBoostingConfig {
        max_iter: 20,
        ..GradientBoostingConfig::default()
    }
}

/// Repeats the value columns of the newest row in each window
#[derive(Debug, Default)]
struct LastValue {
    outputs: usize,
}

impl Regressor for LastValue {
    fn train(&mut self, _inputs: ArrayView2<'_, f64>, targets: ArrayView2<'_, f64>) -> Result<()> {
        self.outputs = targets.ncols();
        Ok(())
    }

    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        // each row holds one value column and three derived columns per series
        let start = inputs.ncols() - 4 * self.outputs;
        Ok(inputs.slice(s![.., start..start + self.outputs]).to_owned())
    }

    fn name(&self) -> &str {
        "last value"
    }
}

#[test]
fn test_end_to_end_default_model() {
    let records = hourly_rows(200);
    let pipeline = ForecastPipeline::new(ForecastParams::new(5, 0.5).unwrap()).unwrap();

    let outcome = pipeline.run(&records).unwrap();

    assert_eq!(outcome.window_size, 100);
    assert_eq!(outcome.windows, 96);
    assert_eq!(outcome.granularity, Duration::hours(1));

    let columns: Vec<&str> = outcome.errors.iter().map(|(name, _)| name).collect();
    assert_eq!(columns, vec!["load", "temperature", "humidity"]);
    assert!(outcome.errors.iter().all(|(_, mse)| mse >= 0.0 && mse.is_finite()));

    let last = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(199);
    let forecast = &outcome.forecast;
    assert_eq!(forecast.len(), 5);
    for (k, point) in forecast.points().iter().enumerate() {
        assert_eq!(point.timestamp, last + Duration::hours(k as i64 + 1));
        assert_eq!(point.values.len(), 3);
        assert!(point.values.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_constant_series_has_zero_error() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let records: Vec<Value> = (0..60)
        .map(|i| json!({"ts": (start + Duration::minutes(15 * i)).to_rfc3339(), "a": 3.0, "b": -7}))
        .collect();

    let pipeline = ForecastPipeline::new(ForecastParams::new(3, 0.4).unwrap())
        .unwrap()
        .with_model_config(fast_config());
    let outcome = pipeline.run(&records).unwrap();

    assert_abs_diff_eq!(outcome.errors.get("a").unwrap(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(outcome.errors.get("b").unwrap(), 0.0, epsilon = 1e-12);
    assert_eq!(outcome.forecast.column("a").unwrap(), vec![3.0; 3]);
    assert_eq!(
        outcome.forecast.points()[2].timestamp,
        start + Duration::minutes(15 * 62)
    );
}

#[test]
fn test_zero_periods_returns_errors_only() {
    let pipeline = ForecastPipeline::new(ForecastParams::new(0, 0.3).unwrap())
        .unwrap()
        .with_model_config(fast_config());

    let outcome = pipeline.run(&hourly_rows(80)).unwrap();

    assert!(outcome.forecast.is_empty());
    assert_eq!(outcome.errors.len(), 3);
}

#[test]
fn test_window_as_long_as_series_fails() {
    let pipeline = ForecastPipeline::new(ForecastParams::new(5, 1.0).unwrap()).unwrap();

    let err = pipeline.run(&hourly_rows(100)).unwrap_err();

    assert!(matches!(err, ForecastError::InsufficientData(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_custom_regressor_projects_last_values() {
    let records = hourly_rows(60);
    let pipeline = ForecastPipeline::new(ForecastParams::new(4, 0.5).unwrap())
        .unwrap()
        .with_regressor(|| Box::new(LastValue::default()));

    let outcome = pipeline.run(&records).unwrap();

    let last = &records[59];
    for name in ["load", "temperature", "humidity"] {
        let expected = last[name].as_f64().unwrap();
        for value in outcome.forecast.column(name).unwrap() {
            assert_abs_diff_eq!(value, expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_shuffled_duplicates_match_canonical_input() {
    let records = hourly_rows(60);

    let mut noisy: Vec<Value> = records.iter().rev().cloned().collect();
    let mut stale = records[10].clone();
    stale["load"] = json!(1e6);
    // the stale copy comes first, so the original row wins
    noisy.insert(0, stale);

    let pipeline = ForecastPipeline::new(ForecastParams::new(2, 0.5).unwrap())
        .unwrap()
        .with_regressor(|| Box::new(LastValue::default()));

    let expected = pipeline.run(&records).unwrap();
    let actual = pipeline.run(&noisy).unwrap();

    assert_eq!(actual.windows, expected.windows);
    assert_eq!(actual.errors, expected.errors);
    assert_eq!(actual.forecast, expected.forecast);
}

#[test]
fn test_model_failure_is_training_error() {
    #[derive(Debug)]
    struct Broken;

    impl Regressor for Broken {
        fn train(&mut self, _: ArrayView2<'_, f64>, _: ArrayView2<'_, f64>) -> Result<()> {
            Err(ForecastError::InvalidInput("singular".to_string()))
        }

        fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            Ok(Array2::zeros((inputs.nrows(), 1)))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    let pipeline = ForecastPipeline::new(ForecastParams::new(1, 0.5).unwrap())
        .unwrap()
        .with_regressor(|| Box::new(Broken));

    let err = pipeline.run(&hourly_rows(60)).unwrap_err();
    assert!(matches!(err, ForecastError::ModelTraining(_)));
    assert!(!err.is_client_error());
}

#[test]
fn test_historical_error_compares_next_row() {
    let records = hourly_rows(60);
    let pipeline = ForecastPipeline::new(ForecastParams::new(1, 0.5).unwrap())
        .unwrap()
        .with_regressor(|| Box::new(LastValue::default()));

    let outcome = pipeline.run(&records).unwrap();

    // 56 feature rows after the 4 warm-up rows, windows of 30
    assert_eq!(outcome.window_size, 30);
    assert_eq!(outcome.windows, 26);
    for name in ["load", "temperature", "humidity"] {
        let value = |i: usize| records[i][name].as_f64().unwrap();
        // window k ends at record 33 + k and is scored against record 34 + k
        let expected = (0..26)
            .map(|k| (value(33 + k) - value(34 + k)).powi(2))
            .sum::<f64>()
            / 26.0;
        assert_abs_diff_eq!(outcome.errors.get(name).unwrap(), expected, epsilon = 1e-9);
    }
}

#[test]
fn test_horizon_past_date_range_is_invalid_input() {
    let step = Duration::days(365 * 250).num_milliseconds();
    let records: Vec<Value> = (0..30)
        .map(|i| json!({"t": i * step, "a": (i % 7) as f64}))
        .collect();
    let pipeline = ForecastPipeline::new(ForecastParams::new(1100, 0.5).unwrap())
        .unwrap()
        .with_model_config(fast_config());

    let err = pipeline.run(&records).unwrap_err();

    assert!(matches!(err, ForecastError::InvalidInput(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_oversized_horizon_rejected_up_front() {
    let err = ForecastParams::new(1_000_000_000_000, 0.5).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidInput(_)));

    let params = ForecastParams::new(MAX_PERIODS as i64, 0.5).unwrap();
    assert_eq!(params.n_periods, MAX_PERIODS);
}
