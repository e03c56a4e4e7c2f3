//! Moving average calculations
//!
//! Contains the streaming Simple Moving Average (SMA) and a batch helper
//! that aligns rolling means with their source rows.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) over the last `period` values
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest one once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Current average, or `None` while fewer than `period` values were seen
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.period {
            return None;
        }

        Some(self.sum / self.period as f64)
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Whether a full window of values has been observed
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.period
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Rolling mean of `values` over `period` rows.
///
/// Slot `t` holds `mean(values[t + 1 - period ..= t])`, and the first
/// `period - 1` slots are `None`.
pub fn rolling_mean(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut sma = SimpleMovingAverage::new(period)?;

    Ok(values
        .iter()
        .map(|&value| {
            sma.update(value);
            sma.value()
        })
        .collect())
}
