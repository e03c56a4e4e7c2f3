//! Sliding-window supervised dataset
//!
//! Window `i` flattens rows `[i, i + window_size)` of the normalized matrix
//! into one input vector; its target is the value-column slice of row
//! `i + window_size`. Windows advance one row at a time.

use crate::error::{ForecastError, Result};
use crate::utils::train_split_len;
use ndarray::{s, Array2, ArrayView2};
use tracing::debug;

/// Smallest window the service ever uses
pub const MIN_WINDOW_SIZE: usize = 24;

/// Largest window the service ever uses
pub const MAX_WINDOW_SIZE: usize = 1000;

/// Window length for a series of `total_rows` rows.
///
/// `floor(total_rows * analysis_ratio)` clamped to
/// `[MIN_WINDOW_SIZE, MAX_WINDOW_SIZE]`.
pub fn window_size(total_rows: usize, analysis_ratio: f64) -> usize {
    let scaled = (total_rows as f64 * analysis_ratio).floor();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled.min(MAX_WINDOW_SIZE as f64) as usize
    } else {
        0
    };
    scaled.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE)
}

/// Flattened input windows and their one-step-ahead targets
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    inputs: Array2<f64>,
    targets: Array2<f64>,
    window_size: usize,
}

impl WindowedDataset {
    /// One flattened window per row
    pub fn inputs(&self) -> ArrayView2<'_, f64> {
        self.inputs.view()
    }

    /// One target row (value columns only) per window
    pub fn targets(&self) -> ArrayView2<'_, f64> {
        self.targets.view()
    }

    /// Rows per window
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    /// Check if no window could be built
    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }

    /// Number of leading windows used for training
    pub fn train_len(&self) -> usize {
        train_split_len(self.len())
    }

    /// Chronological prefix used to fit the model
    pub fn train_split(&self) -> (ArrayView2<'_, f64>, ArrayView2<'_, f64>) {
        let n = self.train_len();
        (
            self.inputs.slice(s![..n, ..]),
            self.targets.slice(s![..n, ..]),
        )
    }

    /// Remaining windows after the training prefix
    pub fn validation_split(&self) -> (ArrayView2<'_, f64>, ArrayView2<'_, f64>) {
        let n = self.train_len();
        (
            self.inputs.slice(s![n.., ..]),
            self.targets.slice(s![n.., ..]),
        )
    }
}

/// Slices a normalized matrix into a [`WindowedDataset`]
#[derive(Debug, Clone, Copy)]
pub struct WindowedDatasetBuilder {
    window_size: usize,
    value_columns: usize,
}

impl WindowedDatasetBuilder {
    /// Create a builder for windows of `window_size` rows whose targets are
    /// the first `value_columns` columns
    pub fn new(window_size: usize, value_columns: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(ForecastError::InvalidInput(
                "Window size must be positive".to_string(),
            ));
        }
        if value_columns == 0 {
            return Err(ForecastError::InvalidInput(
                "At least one value column is required".to_string(),
            ));
        }

        Ok(Self {
            window_size,
            value_columns,
        })
    }

    /// Build every stride-1 window of the matrix
    pub fn build(&self, matrix: &Array2<f64>) -> Result<WindowedDataset> {
        let rows = matrix.nrows();
        let width = matrix.ncols();

        if rows <= self.window_size {
            return Err(ForecastError::InsufficientData(format!(
                "Window size {} needs more than {} rows, got {}",
                self.window_size, self.window_size, rows
            )));
        }
        if self.value_columns > width {
            return Err(ForecastError::InvalidInput(format!(
                "Matrix has {} columns but {} value columns were requested",
                width, self.value_columns
            )));
        }

        let count = rows - self.window_size;
        let mut inputs = Vec::with_capacity(count * self.window_size * width);
        let mut targets = Vec::with_capacity(count * self.value_columns);

        for i in 0..count {
            inputs.extend(matrix.slice(s![i..i + self.window_size, ..]).iter());
            targets.extend(
                matrix
                    .slice(s![i + self.window_size, ..self.value_columns])
                    .iter(),
            );
        }

        debug!(
            windows = count,
            window_size = self.window_size,
            input_width = self.window_size * width,
            "built windowed dataset"
        );

        Ok(WindowedDataset {
            inputs: Array2::from_shape_vec((count, self.window_size * width), inputs)?,
            targets: Array2::from_shape_vec((count, self.value_columns), targets)?,
            window_size: self.window_size,
        })
    }
}
