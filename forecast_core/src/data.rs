//! Time series data handling for forecasting
//!
//! Raw rows arrive as JSON objects whose first field carries the timestamp.
//! [`TimeSeriesNormalizer`] turns them into a canonical [`TimeSeries`]:
//! strictly increasing timestamps, one row per timestamp and only numeric
//! columns without gaps. [`DataLoader`] reads the same rows from files.

use crate::error::{ForecastError, Result};
use crate::utils::{parse_timestamp, timestamp_from_millis};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Canonical time series: a timestamp index plus numeric value columns
#[derive(Debug, Clone)]
pub struct TimeSeries {
    /// Strictly increasing row timestamps
    timestamps: Vec<DateTime<Utc>>,
    /// Value columns, one row per timestamp
    df: DataFrame,
    /// Names of the value columns in input order
    value_columns: Vec<String>,
}

impl TimeSeries {
    /// Create a time series from a timestamp index and named value columns.
    ///
    /// The caller guarantees the canonical invariants; lengths are checked.
    pub fn new(timestamps: Vec<DateTime<Utc>>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != timestamps.len()) {
            return Err(ForecastError::InvalidInput(format!(
                "Column '{}' has {} values for {} timestamps",
                name,
                values.len(),
                timestamps.len()
            )));
        }

        let value_columns = columns.iter().map(|(name, _)| name.clone()).collect();
        let df = frame_from_columns(columns)?;

        Ok(Self {
            timestamps,
            df,
            value_columns,
        })
    }

    /// Get the DataFrame holding the value columns
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Get the row timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Timestamp of the most recent row
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Get the value column names
    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// Get a column as f64 values
    pub fn column_values(&self, column_name: &str) -> Result<Vec<f64>> {
        column_as_f64(&self.df, column_name)
    }

    /// Check if the time series is empty
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
}

/// Builds a [`TimeSeries`] out of raw JSON rows
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesNormalizer;

/// One raw row after its timestamp was parsed
struct ParsedRow<'a> {
    timestamp: DateTime<Utc>,
    fields: &'a Map<String, Value>,
}

impl TimeSeriesNormalizer {
    /// Create a new normalizer
    pub fn new() -> Self {
        Self
    }

    /// Canonicalize raw rows.
    ///
    /// The first field of the first row names the time column. Rows are
    /// stably sorted by timestamp, duplicates keep the last row in input
    /// order, non-numeric columns are dropped and so are rows with a missing
    /// value in any retained column.
    pub fn normalize(&self, records: &[Value]) -> Result<TimeSeries> {
        if records.is_empty() {
            return Err(ForecastError::InvalidInput(
                "The series must contain at least one row".to_string(),
            ));
        }

        let time_column = Self::detect_time_column(records)?;
        let mut rows = records
            .iter()
            .enumerate()
            .map(|(i, record)| Self::parse_row(i, record, &time_column))
            .collect::<Result<Vec<_>>>()?;

        if !rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            rows.sort_by_key(|row| row.timestamp);
        }
        let rows = Self::keep_last_per_timestamp(rows);

        let value_columns = Self::detect_value_columns(&rows, &time_column);
        if value_columns.is_empty() {
            return Err(ForecastError::InvalidInput(
                "No numeric columns found in data".to_string(),
            ));
        }

        let mut timestamps = Vec::with_capacity(rows.len());
        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(rows.len()); value_columns.len()];
        for row in &rows {
            let values: Option<Vec<f64>> = value_columns
                .iter()
                .map(|name| row.fields.get(name).and_then(Value::as_f64))
                .collect();

            if let Some(values) = values {
                timestamps.push(row.timestamp);
                for (column, value) in columns.iter_mut().zip(values) {
                    column.push(value);
                }
            }
        }

        if timestamps.is_empty() {
            return Err(ForecastError::InvalidInput(
                "No complete rows remain after dropping missing values".to_string(),
            ));
        }

        debug!(
            input_rows = records.len(),
            canonical_rows = timestamps.len(),
            value_columns = ?value_columns,
            "normalized time series"
        );

        TimeSeries::new(timestamps, value_columns.into_iter().zip(columns).collect())
    }

    /// Name of the first field of the first row
    fn detect_time_column(records: &[Value]) -> Result<String> {
        records
            .first()
            .and_then(Value::as_object)
            .and_then(|fields| fields.keys().next())
            .cloned()
            .ok_or_else(|| {
                ForecastError::InvalidInput(
                    "Rows must be objects whose first field is the timestamp".to_string(),
                )
            })
    }

    fn parse_row<'a>(index: usize, record: &'a Value, time_column: &str) -> Result<ParsedRow<'a>> {
        let fields = record.as_object().ok_or_else(|| {
            ForecastError::InvalidInput(format!("Row {} is not an object", index))
        })?;

        let raw = fields.get(time_column).ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "Row {} has no '{}' field",
                index, time_column
            ))
        })?;

        let timestamp = match raw {
            Value::String(s) => parse_timestamp(s),
            Value::Number(n) => n.as_i64().and_then(timestamp_from_millis),
            _ => None,
        }
        .ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "Row {} has an unparseable timestamp: {}",
                index, raw
            ))
        })?;

        Ok(ParsedRow { timestamp, fields })
    }

    /// Collapse runs of equal timestamps to their last row.
    ///
    /// Expects rows sorted by timestamp with ties in input order.
    fn keep_last_per_timestamp(rows: Vec<ParsedRow<'_>>) -> Vec<ParsedRow<'_>> {
        let mut kept: Vec<ParsedRow<'_>> = Vec::with_capacity(rows.len());
        for row in rows {
            match kept.last_mut() {
                Some(last) if last.timestamp == row.timestamp => *last = row,
                _ => kept.push(row),
            }
        }
        kept
    }

    /// Columns, in order of first appearance, whose every present value is a
    /// number. Nulls and absent keys do not disqualify a column.
    fn detect_value_columns(rows: &[ParsedRow<'_>], time_column: &str) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for row in rows {
            for key in row.fields.keys() {
                if key != time_column && !order.contains(key) {
                    order.push(key.clone());
                }
            }
        }

        order
            .into_iter()
            .filter(|name| {
                let present: Vec<&Value> = rows
                    .iter()
                    .filter_map(|row| row.fields.get(name))
                    .filter(|value| !value.is_null())
                    .collect();
                !present.is_empty() && present.iter().all(|value| value.is_number())
            })
            .collect()
    }
}

/// Data loader for time series files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load and canonicalize time series data from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeries> {
        let records = Self::read_csv_records(path)?;
        TimeSeriesNormalizer::new().normalize(&records)
    }

    /// Load and canonicalize time series data from a JSON array of rows
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<TimeSeries> {
        let records = Self::read_json_records(path)?;
        TimeSeriesNormalizer::new().normalize(&records)
    }

    /// Read CSV rows as JSON objects keyed by header.
    ///
    /// Cells that parse as numbers become numbers, empty cells become null
    /// and everything else is kept as a string.
    pub fn read_csv_records<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(ForecastError::InvalidInput(
                "CSV input has no header".to_string(),
            ));
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let fields: Map<String, Value> = headers
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.to_string(), Self::parse_cell(cell)))
                .collect();
            records.push(Value::Object(fields));
        }

        Ok(records)
    }

    /// Read a JSON array of row objects
    pub fn read_json_records<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
        let file = File::open(path)?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;

        match value {
            Value::Array(records) => Ok(records),
            _ => Err(ForecastError::InvalidInput(
                "JSON input must be an array of rows".to_string(),
            )),
        }
    }

    fn parse_cell(cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        if let Ok(int) = cell.parse::<i64>() {
            return Value::from(int);
        }
        match cell.parse::<f64>() {
            Ok(float) if float.is_finite() => Value::from(float),
            _ => Value::String(cell.to_string()),
        }
    }
}

/// Build a DataFrame out of named f64 columns
pub(crate) fn frame_from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<DataFrame> {
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| Column::from(Series::new(name.as_str().into(), values)))
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Helper to get a DataFrame column as f64 values
pub(crate) fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
    let col = df.column(column_name).map_err(|e| {
        ForecastError::InvalidInput(format!("Column '{}' not found: {}", column_name, e))
    })?;

    let values = col.as_materialized_series().f64().map_err(|e| {
        ForecastError::InvalidInput(format!(
            "Column '{}' cannot be read as f64: {}",
            column_name, e
        ))
    })?;

    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
