//! # Forecast Core
//!
//! Recursive multi-step forecasting of multivariate, irregularly sampled
//! time series.
//!
//! ## Features
//!
//! - Canonicalization of raw row objects (timestamp parsing, sorting, last-wins
//!   deduplication, numeric column selection)
//! - Lag and rolling features per value column (`diff1`, `ma3`, `ma5`)
//! - Reversible min-max scaling
//! - Sliding-window datasets with one-step-ahead targets
//! - Histogram gradient boosted trees, one per value column
//! - In-sample error per column and recursive projection of future periods
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_core::{ForecastParams, ForecastPipeline};
//! use serde_json::json;
//!
//! let records: Vec<_> = (0..200)
//!     .map(|i| {
//!         let ts = format!("2024-01-{:02}T{:02}:00:00Z", 1 + i / 24, i % 24);
//!         json!({"ts": ts, "load": i % 24})
//!     })
//!     .collect();
//!
//! let pipeline = ForecastPipeline::new(ForecastParams::new(5, 0.5)?)?;
//! let outcome = pipeline.run(&records)?;
//!
//! for (column, mse) in outcome.errors.iter() {
//!     println!("{column}: {mse}");
//! }
//! # Ok::<(), forecast_core::ForecastError>(())
//! ```

pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod projection;
pub mod scaling;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use crate::data::{DataLoader, TimeSeries, TimeSeriesNormalizer};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::HistoricalEvaluator;
pub use crate::features::{FeatureBuilder, FeatureTable};
pub use crate::metrics::ErrorMap;
pub use crate::models::{ForecastModel, GradientBoostingConfig, Regressor};
pub use crate::pipeline::{ForecastOutcome, ForecastParams, ForecastPipeline, MAX_PERIODS};
pub use crate::projection::{ForecastPoint, ForecastResult, RecursiveProjector};
pub use crate::scaling::ScalingCodec;
pub use crate::window::{WindowedDataset, WindowedDatasetBuilder};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
