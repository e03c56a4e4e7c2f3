//! Recursive multi-step projection
//!
//! Each step feeds the model the current buffer of `window_size` normalized
//! rows and appends the prediction as the newest row. Only the value-column
//! slots of an appended row are filled; its derived-feature slots stay zero
//! for the rest of the projection.

use crate::error::{ForecastError, Result};
use crate::models::ForecastModel;
use crate::scaling::ScalingCodec;
use chrono::{DateTime, SecondsFormat, Utc};
use ndarray::{Array1, Array2, ArrayView2};
use serde_json::{Map, Number, Value};
use std::collections::VecDeque;
use tracing::debug;

/// Steps reserved up front; longer projections grow as they go
const PREALLOCATED_STEPS: usize = 1024;

/// One projected period
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    /// Timestamp of the period
    pub timestamp: DateTime<Utc>,
    /// Projected value per value column
    pub values: Vec<f64>,
}

/// Projected periods in time order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastResult {
    value_columns: Vec<String>,
    points: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Create a result from points whose values follow `value_columns`
    pub fn new(value_columns: Vec<String>, points: Vec<ForecastPoint>) -> Result<Self> {
        if let Some(point) = points.iter().find(|p| p.values.len() != value_columns.len()) {
            return Err(ForecastError::InvalidInput(format!(
                "Forecast point has {} values for {} columns",
                point.values.len(),
                value_columns.len()
            )));
        }

        Ok(Self {
            value_columns,
            points,
        })
    }

    /// Names of the projected columns
    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// Projected periods
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of projected periods
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if nothing was projected
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Projected values of one column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.value_columns.iter().position(|c| c == name)?;
        Some(self.points.iter().map(|p| p.values[j]).collect())
    }

    /// One JSON object per period: `timestamp` (RFC 3339, with as many
    /// fractional digits as it needs) first, then every value column
    pub fn to_records(&self) -> Vec<Value> {
        self.points
            .iter()
            .map(|point| {
                let mut record = Map::new();
                record.insert(
                    "timestamp".to_string(),
                    Value::String(point.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                );
                for (name, value) in self.value_columns.iter().zip(&point.values) {
                    let value = Number::from_f64(*value).map_or(Value::Null, Value::Number);
                    record.insert(name.clone(), value);
                }
                Value::Object(record)
            })
            .collect()
    }
}

/// Projects future periods by feeding predictions back into the window
#[derive(Debug)]
pub struct RecursiveProjector<'a> {
    model: &'a ForecastModel,
    codec: &'a ScalingCodec,
}

impl<'a> RecursiveProjector<'a> {
    /// Create a projector for a trained model and the codec its inputs were
    /// encoded with
    pub fn new(model: &'a ForecastModel, codec: &'a ScalingCodec) -> Self {
        Self { model, codec }
    }

    /// Run `horizon` steps from `last_window` and return the normalized
    /// value-column predictions, one row per step
    pub fn project_normalized(
        &self,
        last_window: ArrayView2<'_, f64>,
        horizon: usize,
    ) -> Result<Array2<f64>> {
        let width = last_window.ncols();
        let values = self.codec.value_columns();
        if width != self.codec.width() {
            return Err(ForecastError::InvalidInput(format!(
                "Window rows have {} columns, codec expects {}",
                width,
                self.codec.width()
            )));
        }
        if last_window.nrows() == 0 {
            return Err(ForecastError::InsufficientData(
                "Projection needs a non-empty window".to_string(),
            ));
        }

        let mut buffer: VecDeque<Array1<f64>> =
            last_window.rows().into_iter().map(|row| row.to_owned()).collect();
        let mut steps = Vec::with_capacity(horizon.min(PREALLOCATED_STEPS) * values);

        for _ in 0..horizon {
            let flattened: Array1<f64> =
                buffer.iter().flat_map(|row| row.iter().copied()).collect();
            let prediction = self.model.predict_one(flattened.view())?;

            let mut next = Array1::zeros(width);
            next.slice_mut(ndarray::s![..values]).assign(&prediction);
            steps.extend(prediction.iter().copied());

            buffer.pop_front();
            buffer.push_back(next);
        }

        Ok(Array2::from_shape_vec((horizon, values), steps)?)
    }

    /// Project one period per entry of `timestamps`, decoded back to the
    /// units of the input series
    pub fn project(
        &self,
        last_window: ArrayView2<'_, f64>,
        timestamps: Vec<DateTime<Utc>>,
        value_columns: &[String],
    ) -> Result<ForecastResult> {
        if value_columns.len() != self.codec.value_columns() {
            return Err(ForecastError::InvalidInput(format!(
                "Got {} column names for {} value columns",
                value_columns.len(),
                self.codec.value_columns()
            )));
        }
        let horizon = timestamps.len();
        if horizon == 0 {
            return ForecastResult::new(value_columns.to_vec(), Vec::new());
        }

        let normalized = self.project_normalized(last_window, horizon)?;
        let decoded = self.codec.decode(normalized.view())?;

        let points = timestamps
            .into_iter()
            .zip(decoded.rows())
            .map(|(timestamp, row)| ForecastPoint {
                timestamp,
                values: row.to_vec(),
            })
            .collect();

        debug!(horizon, "projected forecast");
        ForecastResult::new(value_columns.to_vec(), points)
    }
}
