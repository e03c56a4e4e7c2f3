//! Feature discretization for histogram-based tree growing
//!
//! Each feature is cut into at most `max_bins` bins. Features with few
//! distinct values split between consecutive values; the rest split on
//! evenly spaced quantiles. Bin `b` holds values `v` with
//! `thresholds[b - 1] < v <= thresholds[b]`.

use ndarray::ArrayView2;

/// Upper bound on the number of bins a feature may use
pub const MAX_BINS_LIMIT: usize = 256;

/// Per-feature bin thresholds fitted on training inputs
#[derive(Debug, Clone)]
pub struct FeatureBinner {
    thresholds: Vec<Vec<f64>>,
}

/// Column-major binned copy of a training matrix
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    columns: Vec<Vec<u8>>,
    n_bins: Vec<usize>,
    n_samples: usize,
}

impl BinnedMatrix {
    /// Bin indices of one feature, one per sample
    pub fn feature(&self, feature: usize) -> &[u8] {
        &self.columns[feature]
    }

    /// Number of bins in use for a feature
    pub fn n_bins(&self, feature: usize) -> usize {
        self.n_bins[feature]
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

impl FeatureBinner {
    /// Fit thresholds for every column of `x`
    pub fn fit(x: ArrayView2<'_, f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS_LIMIT);

        let thresholds = x
            .columns()
            .into_iter()
            .map(|column| {
                let mut values: Vec<f64> = column.iter().copied().collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                Self::column_thresholds(&values, max_bins)
            })
            .collect();

        Self { thresholds }
    }

    /// Thresholds of one feature
    pub fn thresholds(&self, feature: usize) -> &[f64] {
        &self.thresholds[feature]
    }

    /// Upper edge of a bin, used as the split threshold on raw values
    pub fn bin_upper_edge(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature]
            .get(bin)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Map `x` to bin indices with the fitted thresholds
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> BinnedMatrix {
        let columns = x
            .columns()
            .into_iter()
            .zip(&self.thresholds)
            .map(|(column, thresholds)| {
                column
                    .iter()
                    .map(|&v| thresholds.partition_point(|&t| t < v) as u8)
                    .collect()
            })
            .collect();

        BinnedMatrix {
            columns,
            n_bins: self.thresholds.iter().map(|t| t.len() + 1).collect(),
            n_samples: x.nrows(),
        }
    }

    fn column_thresholds(sorted: &[f64], max_bins: usize) -> Vec<f64> {
        let mut distinct = sorted.to_vec();
        distinct.dedup();

        if distinct.len() <= max_bins {
            return distinct
                .windows(2)
                .map(|pair| (pair[0] + pair[1]) / 2.0)
                .collect();
        }

        let mut thresholds: Vec<f64> = (1..max_bins)
            .map(|k| quantile(sorted, k as f64 / max_bins as f64))
            .collect();
        thresholds.dedup();
        // A threshold at the maximum would leave its right bin empty.
        thresholds.retain(|&t| t < distinct[distinct.len() - 1]);
        thresholds
    }
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_few_distinct_values_use_midpoints() {
        let x = array![[1.0], [3.0], [3.0], [5.0]];
        let binner = FeatureBinner::fit(x.view(), 255);

        assert_eq!(binner.thresholds(0), &[2.0, 4.0]);

        let binned = binner.transform(x.view());
        assert_eq!(binned.feature(0), &[0, 1, 1, 2]);
        assert_eq!(binned.n_bins(0), 3);
    }

    #[test]
    fn test_upper_edge_matches_binning() {
        let x = Array2::from_shape_fn((500, 1), |(i, _)| (i as f64).sin() * 100.0);
        let binner = FeatureBinner::fit(x.view(), 32);
        let binned = binner.transform(x.view());

        assert!(binner.thresholds(0).len() < 32);
        for (i, &bin) in binned.feature(0).iter().enumerate() {
            let value = x[[i, 0]];
            assert!(value <= binner.bin_upper_edge(0, bin as usize));
            if bin > 0 {
                assert!(value > binner.bin_upper_edge(0, bin as usize - 1));
            }
        }
    }

    #[test]
    fn test_constant_feature_has_one_bin() {
        let x = array![[2.0], [2.0], [2.0]];
        let binner = FeatureBinner::fit(x.view(), 255);

        assert!(binner.thresholds(0).is_empty());
        assert_eq!(binner.transform(x.view()).n_bins(0), 1);
    }
}
