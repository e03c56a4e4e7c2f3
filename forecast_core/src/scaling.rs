//! Reversible min-max scaling
//!
//! A [`ScalingCodec`] is fitted once per request on the full feature matrix
//! and then maps every column into `[0, 1]`. Decoding only ever needs the
//! leading value columns: predictions are padded with zeros up to the full
//! width, inverted, and the padding is dropped again.

use crate::error::{ForecastError, Result};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

/// Per-column min-max transform fitted on one feature matrix
#[derive(Debug, Clone)]
pub struct ScalingCodec {
    mins: Array1<f64>,
    ranges: Array1<f64>,
    value_columns: usize,
}

impl ScalingCodec {
    /// Record each column's minimum and range.
    ///
    /// A column whose values are all equal gets a range of 1, so it encodes
    /// to 0 and decodes back to its constant.
    pub fn fit(table: &Array2<f64>, value_columns: usize) -> Result<Self> {
        if table.nrows() == 0 || table.ncols() == 0 {
            return Err(ForecastError::InsufficientData(
                "Cannot fit scaling on an empty table".to_string(),
            ));
        }
        if value_columns == 0 || value_columns > table.ncols() {
            return Err(ForecastError::InvalidInput(format!(
                "Value column count {} does not fit a table with {} columns",
                value_columns,
                table.ncols()
            )));
        }
        if table.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "Feature table contains non-finite values".to_string(),
            ));
        }

        let mins = table.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let maxs = table.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let ranges = (&maxs - &mins).mapv(|range| if range == 0.0 { 1.0 } else { range });

        Ok(Self {
            mins,
            ranges,
            value_columns,
        })
    }

    /// Number of columns the codec was fitted on
    pub fn width(&self) -> usize {
        self.mins.len()
    }

    /// Number of leading value columns
    pub fn value_columns(&self) -> usize {
        self.value_columns
    }

    /// Map every cell to `(value - min) / range`
    pub fn encode(&self, table: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(table.ncols(), self.width())?;
        Ok((table - &self.mins) / &self.ranges)
    }

    /// Invert [`ScalingCodec::encode`] on full-width rows
    pub fn inverse_transform(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(matrix.ncols(), self.width())?;
        Ok(matrix * &self.ranges + &self.mins)
    }

    /// Decode rows holding only the value columns.
    ///
    /// The rows are zero-padded to the fitted width before inversion and the
    /// padding columns are discarded afterwards.
    pub fn decode(&self, values: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(values.ncols(), self.value_columns)?;

        let mut padded = Array2::zeros((values.nrows(), self.width()));
        padded
            .slice_mut(s![.., ..self.value_columns])
            .assign(&values);

        let restored = self.inverse_transform(&padded)?;
        Ok(restored.slice(s![.., ..self.value_columns]).to_owned())
    }

    fn check_width(&self, actual: usize, expected: usize) -> Result<()> {
        if actual != expected {
            return Err(ForecastError::InvalidInput(format!(
                "Expected {} columns, got {}",
                expected, actual
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_matrix_eq(actual: &Array2<f64>, expected: &Array2<f64>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_encode_maps_into_unit_range() {
        let table = array![[10.0, -1.0, 5.0], [20.0, 1.0, 5.0], [15.0, 0.0, 5.0]];
        let codec = ScalingCodec::fit(&table, 1).unwrap();
        let encoded = codec.encode(&table).unwrap();

        assert_matrix_eq(
            &encoded,
            &array![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.5, 0.5, 0.0]],
        );
    }

    #[test]
    fn test_round_trip() {
        let table = array![[3.5, 100.0], [-2.0, 250.0], [7.25, 175.5]];
        let codec = ScalingCodec::fit(&table, 2).unwrap();
        let restored = codec
            .inverse_transform(&codec.encode(&table).unwrap())
            .unwrap();

        assert_matrix_eq(&restored, &table);
    }

    #[test]
    fn test_decode_value_columns_only() {
        let table = array![[0.0, 40.0, 9.0], [10.0, 80.0, 1.0]];
        let codec = ScalingCodec::fit(&table, 2).unwrap();
        let decoded = codec.decode(array![[0.5, 0.25]].view()).unwrap();

        assert_matrix_eq(&decoded, &array![[5.0, 50.0]]);
        assert!(codec.decode(array![[0.5, 0.25, 0.0]].view()).is_err());
    }

    #[test]
    fn test_constant_column_decodes_to_constant() {
        let table = array![[7.0, 1.0], [7.0, 2.0]];
        let codec = ScalingCodec::fit(&table, 1).unwrap();

        let encoded = codec.encode(&table).unwrap();
        assert!(encoded.column(0).iter().all(|&v| v == 0.0));

        let decoded = codec.decode(array![[0.0]].view()).unwrap();
        assert_abs_diff_eq!(decoded[[0, 0]], 7.0);
    }

    #[test]
    fn test_fit_rejects_empty_and_non_finite() {
        assert!(ScalingCodec::fit(&Array2::zeros((0, 3)), 1).is_err());
        assert!(ScalingCodec::fit(&array![[f64::NAN, 1.0]], 1).is_err());
        assert!(ScalingCodec::fit(&array![[1.0, 1.0]], 3).is_err());
    }
}
