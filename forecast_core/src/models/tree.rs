//! Regression trees grown best-first on binned features
//!
//! The grower always expands the open leaf with the largest loss reduction
//! until the leaf budget is spent or no leaf can be split any more. Split
//! search builds a gradient histogram per feature, so its cost is linear in
//! the number of samples at the node.

use super::binning::{BinnedMatrix, FeatureBinner};
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Gains below this are treated as rounding noise
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Shape limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth of any leaf (the root has depth 0)
    pub max_depth: usize,
    /// Maximum number of leaves
    pub max_leaf_nodes: usize,
    /// Minimum number of samples per leaf
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf values
    pub l2_regularization: f64,
    /// Share of features considered at each split
    pub max_features: f64,
}

/// Tree node stored in a flat arena
#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Leaf node holding its (already shrunk) contribution
    Leaf { value: f64 },
    /// Internal node sending `x[feature] <= threshold` to `left`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Contribution of this tree for one raw input row
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct OpenLeaf {
    node: usize,
    indices: Vec<usize>,
    sum_gradients: f64,
    depth: usize,
    split: Option<SplitCandidate>,
}

/// Grows one tree on a binned training matrix
pub struct TreeGrower<'a> {
    binned: &'a BinnedMatrix,
    binner: &'a FeatureBinner,
    params: TreeParams,
}

impl<'a> TreeGrower<'a> {
    /// Create a grower over binned inputs and the thresholds that produced them
    pub fn new(binned: &'a BinnedMatrix, binner: &'a FeatureBinner, params: TreeParams) -> Self {
        Self {
            binned,
            binner,
            params,
        }
    }

    /// Fit a tree to the negative `gradients`.
    ///
    /// Leaf values are scaled by `shrinkage`. Also returns each training
    /// sample's leaf value, so callers can update their running predictions
    /// without walking the tree again.
    pub fn grow(
        &self,
        gradients: &[f64],
        shrinkage: f64,
        rng: &mut StdRng,
    ) -> (RegressionTree, Vec<f64>) {
        let n_samples = self.binned.n_samples();
        let mut nodes = vec![TreeNode::Leaf { value: 0.0 }];
        let root = self.open_leaf(
            0,
            (0..n_samples).collect(),
            gradients.iter().sum(),
            0,
            gradients,
            rng,
        );

        let mut open = vec![root];
        let mut n_leaves = 1;

        while n_leaves < self.params.max_leaf_nodes {
            let best = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.split.map(|split| (i, split.gain)))
                .fold(None, |best: Option<(usize, f64)>, (i, gain)| match best {
                    Some((_, best_gain)) if best_gain >= gain => best,
                    _ => Some((i, gain)),
                });

            let Some((position, _)) = best else { break };
            let leaf = open.swap_remove(position);
            let Some(split) = leaf.split else { break };

            let bins = self.binned.feature(split.feature);
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = leaf
                .indices
                .iter()
                .partition(|&&i| bins[i] as usize <= split.bin);
            let left_sum: f64 = left_indices.iter().map(|&i| gradients[i]).sum();
            let right_sum = leaf.sum_gradients - left_sum;

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf { value: 0.0 });
            nodes.push(TreeNode::Leaf { value: 0.0 });
            nodes[leaf.node] = TreeNode::Split {
                feature: split.feature,
                threshold: self.binner.bin_upper_edge(split.feature, split.bin),
                left,
                right,
            };

            let depth = leaf.depth + 1;
            open.push(self.open_leaf(left, left_indices, left_sum, depth, gradients, rng));
            open.push(self.open_leaf(right, right_indices, right_sum, depth, gradients, rng));
            n_leaves += 1;
        }

        let mut updates = vec![0.0; n_samples];
        for leaf in open {
            let value = -shrinkage * leaf.sum_gradients
                / (leaf.indices.len() as f64 + self.params.l2_regularization);
            nodes[leaf.node] = TreeNode::Leaf { value };
            for i in leaf.indices {
                updates[i] = value;
            }
        }

        (RegressionTree { nodes }, updates)
    }

    fn open_leaf(
        &self,
        node: usize,
        indices: Vec<usize>,
        sum_gradients: f64,
        depth: usize,
        gradients: &[f64],
        rng: &mut StdRng,
    ) -> OpenLeaf {
        let splittable = depth < self.params.max_depth
            && indices.len() >= 2 * self.params.min_samples_leaf.max(1);

        let split = if splittable {
            let features = self.candidate_features(rng);
            self.find_best_split(&indices, sum_gradients, gradients, &features)
        } else {
            None
        };

        OpenLeaf {
            node,
            indices,
            sum_gradients,
            depth,
            split,
        }
    }

    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        let n_features = self.binned.n_features();
        if self.params.max_features >= 1.0 {
            return (0..n_features).collect();
        }

        let k = ((self.params.max_features * n_features as f64).ceil() as usize)
            .clamp(1, n_features);
        let mut features = rand::seq::index::sample(rng, n_features, k).into_vec();
        features.sort_unstable();
        features
    }

    fn find_best_split(
        &self,
        indices: &[usize],
        sum_gradients: f64,
        gradients: &[f64],
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let lambda = self.params.l2_regularization;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = sum_gradients * sum_gradients / (n as f64 + lambda);

        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature| {
                let n_bins = self.binned.n_bins(feature);
                if n_bins < 2 {
                    return None;
                }

                let bins = self.binned.feature(feature);
                let mut hist_sum = vec![0.0; n_bins];
                let mut hist_count = vec![0usize; n_bins];
                for &i in indices {
                    let bin = bins[i] as usize;
                    hist_sum[bin] += gradients[i];
                    hist_count[bin] += 1;
                }

                let mut best: Option<SplitCandidate> = None;
                let mut left_sum = 0.0;
                let mut left_count = 0usize;
                for bin in 0..n_bins - 1 {
                    left_sum += hist_sum[bin];
                    left_count += hist_count[bin];
                    let right_count = n - left_count;
                    if left_count < min_leaf {
                        continue;
                    }
                    if right_count < min_leaf {
                        break;
                    }

                    let right_sum = sum_gradients - left_sum;
                    let gain = left_sum * left_sum / (left_count as f64 + lambda)
                        + right_sum * right_sum / (right_count as f64 + lambda)
                        - parent_score;

                    if gain > MIN_SPLIT_GAIN && best.map_or(true, |b| gain > b.gain) {
                        best = Some(SplitCandidate { feature, bin, gain });
                    }
                }
                best
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, candidate| match best {
                Some(b) if b.gain >= candidate.gain => Some(b),
                _ => Some(candidate),
            })
    }
}
