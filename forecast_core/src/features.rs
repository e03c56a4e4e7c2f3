//! Lag and rolling-window features
//!
//! Every value column `c` gains three derived columns: the first difference
//! `c_diff1`, the 3-period mean `c_ma3` and the 5-period mean `c_ma5`. The
//! 5-period mean needs four earlier rows, so the first four rows of the
//! series never make it into the feature table.

use crate::data::{column_as_f64, frame_from_columns, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use polars::prelude::DataFrame;
use series_math::differences::difference;
use series_math::moving_averages::rolling_mean;
use tracing::debug;

/// Rows lost to the widest rolling window
pub const WARM_UP_ROWS: usize = 4;

/// Fewest rows a feature table may have
pub const MIN_FEATURE_ROWS: usize = 5;

/// Derived column kinds, in the order they are appended per value column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedFeature {
    /// `c[t] - c[t-1]`
    Diff1,
    /// `mean(c[t-2..=t])`
    Ma3,
    /// `mean(c[t-4..=t])`
    Ma5,
}

impl DerivedFeature {
    /// All derived features in column order
    pub const ALL: [DerivedFeature; 3] = [
        DerivedFeature::Diff1,
        DerivedFeature::Ma3,
        DerivedFeature::Ma5,
    ];

    /// Column name suffix
    pub fn suffix(&self) -> &'static str {
        match self {
            DerivedFeature::Diff1 => "diff1",
            DerivedFeature::Ma3 => "ma3",
            DerivedFeature::Ma5 => "ma5",
        }
    }

    /// Name of the derived column for a value column
    pub fn column_name(&self, value_column: &str) -> String {
        format!("{}_{}", value_column, self.suffix())
    }

    fn derive(&self, values: &[f64]) -> Result<Vec<Option<f64>>> {
        let derived = match self {
            DerivedFeature::Diff1 => difference(values, 1)?,
            DerivedFeature::Ma3 => rolling_mean(values, 3)?,
            DerivedFeature::Ma5 => rolling_mean(values, 5)?,
        };
        Ok(derived)
    }
}

/// Value columns followed by their derived features, warm-up rows removed
#[derive(Debug, Clone)]
pub struct FeatureTable {
    timestamps: Vec<DateTime<Utc>>,
    df: DataFrame,
    value_columns: Vec<String>,
    feature_columns: Vec<String>,
}

impl FeatureTable {
    /// Get the DataFrame holding every column
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Row timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Names of the original value columns; they lead the column order
    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// Names of every column, value columns first
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get a column as f64 values
    pub fn column_values(&self, column_name: &str) -> Result<Vec<f64>> {
        column_as_f64(&self.df, column_name)
    }

    /// Row-major matrix of every column, rows in time order
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((self.len(), self.feature_columns.len()));
        for (j, name) in self.feature_columns.iter().enumerate() {
            let values = self.column_values(name)?;
            for (i, value) in values.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        Ok(matrix)
    }

    /// Raw values of the value columns only
    pub fn value_matrix(&self) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((self.len(), self.value_columns.len()));
        for (j, name) in self.value_columns.iter().enumerate() {
            for (i, value) in self.column_values(name)?.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        Ok(matrix)
    }
}

/// Derives [`FeatureTable`]s from canonical series
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Create a new feature builder
    pub fn new() -> Self {
        Self
    }

    /// Append the derived columns and drop rows where any of them is undefined
    pub fn build(&self, series: &TimeSeries) -> Result<FeatureTable> {
        let value_columns = series.value_columns().to_vec();

        let mut base: Vec<(String, Vec<f64>)> = Vec::with_capacity(value_columns.len());
        let mut derived: Vec<(String, Vec<Option<f64>>)> =
            Vec::with_capacity(value_columns.len() * DerivedFeature::ALL.len());

        for name in &value_columns {
            let values = series.column_values(name)?;
            for feature in DerivedFeature::ALL {
                derived.push((feature.column_name(name), feature.derive(&values)?));
            }
            base.push((name.clone(), values));
        }

        let kept: Vec<usize> = (0..series.len())
            .filter(|&t| derived.iter().all(|(_, column)| column[t].is_some()))
            .collect();

        if kept.len() < MIN_FEATURE_ROWS {
            return Err(ForecastError::InsufficientData(format!(
                "Need at least {} rows after the {}-row feature warm-up, got {}",
                MIN_FEATURE_ROWS,
                WARM_UP_ROWS,
                kept.len()
            )));
        }

        let mut columns: Vec<(String, Vec<f64>)> = base
            .into_iter()
            .map(|(name, values)| (name, kept.iter().map(|&t| values[t]).collect()))
            .collect();
        columns.extend(derived.into_iter().map(|(name, values)| {
            let values = kept.iter().map(|&t| values[t].unwrap_or(f64::NAN)).collect();
            (name, values)
        }));

        let feature_columns: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let timestamps = kept.iter().map(|&t| series.timestamps()[t]).collect();

        debug!(
            input_rows = series.len(),
            feature_rows = kept.len(),
            feature_columns = feature_columns.len(),
            "built feature table"
        );

        Ok(FeatureTable {
            timestamps,
            df: frame_from_columns(columns)?,
            value_columns,
            feature_columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn series(values: &[f64]) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| start + Duration::hours(i as i64))
            .collect();
        TimeSeries::new(timestamps, vec![("load".to_string(), values.to_vec())]).unwrap()
    }

    #[test]
    fn test_drops_exactly_four_rows() {
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let table = FeatureBuilder::new().build(&series(&values)).unwrap();

        assert_eq!(table.len(), values.len() - WARM_UP_ROWS);
        assert_eq!(
            table.feature_columns(),
            &["load", "load_diff1", "load_ma3", "load_ma5"]
        );
    }

    #[test]
    fn test_derived_values() {
        let values = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
        let err = FeatureBuilder::new().build(&series(&values)).unwrap_err();
        // six rows leave only two after warm-up
        assert!(matches!(err, ForecastError::InsufficientData(_)));

        let values = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0, 3.0, 6.0, 9.0];
        let table = FeatureBuilder::new().build(&series(&values)).unwrap();

        assert_eq!(table.column_values("load").unwrap(), vec![5.0, 7.0, 3.0, 6.0, 9.0]);
        assert_eq!(
            table.column_values("load_diff1").unwrap(),
            vec![-3.0, 2.0, -4.0, 3.0, 3.0]
        );
        let ma3 = table.column_values("load_ma3").unwrap();
        assert_relative_eq!(ma3[0], 5.0);
        let ma5 = table.column_values("load_ma5").unwrap();
        assert_relative_eq!(ma5[0], 4.0);
        assert_relative_eq!(ma5[4], 6.0);
    }

    #[test]
    fn test_matrix_layout() {
        let values: Vec<f64> = (0..9).map(|v| v as f64).collect();
        let table = FeatureBuilder::new().build(&series(&values)).unwrap();
        let matrix = table.to_matrix().unwrap();

        assert_eq!(matrix.dim(), (5, 4));
        assert_relative_eq!(matrix[[0, 0]], 4.0);
        assert_relative_eq!(matrix[[0, 1]], 1.0);
        assert_eq!(table.value_matrix().unwrap().dim(), (5, 1));
    }
}
