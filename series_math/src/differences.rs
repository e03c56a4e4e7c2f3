//! Lagged differences

use crate::{MathError, Result};

/// Difference of each value against the value `lag` rows earlier.
///
/// Slot `t` holds `values[t] - values[t - lag]`; the first `lag` slots are
/// `None`.
pub fn difference(values: &[f64], lag: usize) -> Result<Vec<Option<f64>>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Lag must be greater than zero".to_string(),
        ));
    }

    Ok((0..values.len())
        .map(|t| t.checked_sub(lag).map(|prev| values[t] - values[prev]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        let diffs = difference(&[5.0, 7.0, 4.0], 1).unwrap();
        assert_eq!(diffs, vec![None, Some(2.0), Some(-3.0)]);
    }

    #[test]
    fn test_lag_longer_than_series() {
        let diffs = difference(&[1.0, 2.0], 3).unwrap();
        assert_eq!(diffs, vec![None, None]);
    }

    #[test]
    fn test_zero_lag_rejected() {
        assert!(matches!(
            difference(&[1.0], 0),
            Err(MathError::InvalidInput(_))
        ));
    }
}
