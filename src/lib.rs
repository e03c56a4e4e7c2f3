//! # NyxsForecast
//!
//! Umbrella crate for the forecasting workspace. It re-exports the member
//! libraries so applications can depend on a single crate.
//!
//! ## Example
//!
//! ```
//! use nyxs_forecast_workspace::series_math::moving_averages::rolling_mean;
//!
//! let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
//! assert_eq!(means, vec![None, None, Some(2.0), Some(3.0)]);
//! ```

pub use forecast_core;
pub use series_math;

pub use forecast_core::{ForecastOutcome, ForecastParams, ForecastPipeline};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reexported_pipeline() {
        let params = ForecastParams::new(1, 0.5).unwrap();
        let pipeline = ForecastPipeline::new(params).unwrap();

        let err = pipeline.run(&[json!({"t": "2024-01-01", "x": 1})]).unwrap_err();
        assert!(err.is_client_error());
    }
}
