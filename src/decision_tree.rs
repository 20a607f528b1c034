//! CART decision tree classifier (Gini impurity, weighted samples)

use crate::dataset::N_CLASSES;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Values closer than this are treated as the same threshold candidate.
const FEATURE_THRESHOLD: f64 = 1e-7;

const IMPURITY_EPSILON: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf with the weighted class distribution of its training rows
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node: rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features examined per split; all when `None`
    pub max_features: Option<usize>,
    n_features: usize,
    feature_importances: Option<Vec<f64>>,
}

struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

struct TrainingView<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<usize>,
    weights: &'a [f64],
    max_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Fit with unit sample weights.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, seed: u64) -> Result<&mut Self> {
        let weights = vec![1.0; x.nrows()];
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.fit_weighted(x, y, &weights, &mut rng)
    }

    /// Fit using per-row weights; rows with zero weight are ignored. Bootstrap
    /// resampling is expressed as integer draw counts folded into `weights`.
    pub fn fit_weighted<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        weights: &[f64],
        rng: &mut R,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || n_samples != weights.len() {
            return Err(PipelineError::Shape {
                expected: format!("{n_samples} labels and weights"),
                actual: format!("{} labels, {} weights", y.len(), weights.len()),
            });
        }

        if let Some(&label) = y.iter().find(|&&l| l >= N_CLASSES) {
            return Err(PipelineError::Data(format!(
                "class label {label} out of range"
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).filter(|&i| weights[i] > 0.0).collect();
        if indices.is_empty() {
            return Err(PipelineError::Data(
                "decision tree needs at least one weighted sample".to_string(),
            ));
        }

        self.n_features = n_features;

        let view = TrainingView {
            x,
            y,
            weights,
            max_features: self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1)),
        };

        let mut importances = vec![0.0; n_features];
        self.root = Some(self.build_tree(&view, &mut indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(importances);

        Ok(self)
    }

    fn build_tree<R: Rng>(
        &self,
        view: &TrainingView<'_>,
        indices: &mut [usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let distribution = class_weights(view, indices);
        let total: f64 = distribution.iter().sum();
        let impurity = gini(&distribution, total);

        let should_stop = self.max_depth.is_some_and(|d| depth >= d)
            || n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || impurity <= IMPURITY_EPSILON;

        if should_stop {
            return leaf(distribution, total, n_samples);
        }

        let Some(best) = self.find_best_split(view, indices, impurity, total, rng) else {
            return leaf(distribution, total, n_samples);
        };

        let mut left_indices = Vec::new();
        let mut right_indices = Vec::new();
        for &i in indices.iter() {
            if view.x[[i, best.feature_idx]] <= best.threshold {
                left_indices.push(i);
            } else {
                right_indices.push(i);
            }
        }

        importances[best.feature_idx] += total * best.gain;

        let left = Box::new(self.build_tree(
            view,
            &mut left_indices,
            depth + 1,
            importances,
            rng,
        ));
        let right = Box::new(self.build_tree(
            view,
            &mut right_indices,
            depth + 1,
            importances,
            rng,
        ));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Visits features in random order until `max_features` non-constant ones
    /// have been scanned, keeping the split with the largest impurity decrease.
    fn find_best_split<R: Rng>(
        &self,
        view: &TrainingView<'_>,
        indices: &mut [usize],
        parent_impurity: f64,
        total: f64,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let n_samples = indices.len();
        let mut features: Vec<usize> = (0..view.x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;

        for feature_idx in features {
            if visited >= view.max_features {
                break;
            }

            indices.sort_by(|&a, &b| view.x[[a, feature_idx]].total_cmp(&view.x[[b, feature_idx]]));

            let first = view.x[[indices[0], feature_idx]];
            let last = view.x[[indices[n_samples - 1], feature_idx]];
            if last <= first + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let mut left = vec![0.0; N_CLASSES];
            let mut right = class_weights(view, indices);

            for pos in 0..n_samples - 1 {
                let row = indices[pos];
                let w = view.weights[row];
                left[view.y[row]] += w;
                right[view.y[row]] -= w;

                let current = view.x[[row, feature_idx]];
                let next = view.x[[indices[pos + 1], feature_idx]];
                if next <= current + FEATURE_THRESHOLD {
                    continue;
                }

                let n_left = pos + 1;
                if n_left < self.min_samples_leaf || n_samples - n_left < self.min_samples_leaf {
                    continue;
                }

                let left_total: f64 = left.iter().sum();
                let right_total = (total - left_total).max(0.0);
                let child_impurity = (left_total * gini(&left, left_total)
                    + right_total * gini(&right, right_total))
                    / total;
                let gain = parent_impurity - child_impurity;

                if gain > IMPURITY_EPSILON && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = current / 2.0 + next / 2.0;
                    if threshold >= next || !threshold.is_finite() {
                        threshold = current;
                    }
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Class probability rows (`n_samples x N_CLASSES`).
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        self.check_width(x)?;

        let mut proba: Array2<f64> = Array2::zeros((x.nrows(), N_CLASSES));
        for (i, sample) in x.rows().into_iter().enumerate() {
            let distribution = Self::leaf_distribution(root, sample);
            for (c, &p) in distribution.iter().enumerate() {
                proba[[i, c]] = p;
            }
        }

        Ok(proba)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(argmax).collect())
    }

    fn leaf_distribution<'a>(node: &'a TreeNode, sample: ArrayView1<'_, f64>) -> &'a [f64] {
        match node {
            TreeNode::Leaf { distribution, .. } => distribution.as_slice(),
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::leaf_distribution(left, sample)
                } else {
                    Self::leaf_distribution(right, sample)
                }
            }
        }
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() == self.n_features {
            Ok(())
        } else {
            Err(PipelineError::Shape {
                expected: format!("{} feature columns", self.n_features),
                actual: format!("{} feature columns", x.ncols()),
            })
        }
    }

    /// Normalized impurity-decrease importance per feature
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Number of levels, counting a lone leaf as depth 0.
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    pub fn n_leaves(&self) -> usize {
        fn count_leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
            }
        }
        self.root.as_ref().map_or(0, count_leaves)
    }
}

fn class_weights(view: &TrainingView<'_>, indices: &[usize]) -> Vec<f64> {
    let mut distribution = vec![0.0; N_CLASSES];
    for &i in indices {
        distribution[view.y[i]] += view.weights[i];
    }
    distribution
}

fn gini(distribution: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - distribution
        .iter()
        .map(|&w| (w / total).powi(2))
        .sum::<f64>()
}

fn leaf(mut distribution: Vec<f64>, total: f64, n_samples: usize) -> TreeNode {
    if total > 0.0 {
        for w in &mut distribution {
            *w /= total;
        }
    }
    TreeNode::Leaf {
        distribution,
        n_samples,
    }
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}
