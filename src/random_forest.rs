//! Random Forest classifier: bagged CART trees with per-node feature sampling

use crate::dataset::N_CLASSES;
use crate::decision_tree::{argmax, DecisionTree};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for the number of candidate features per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every sample counts once
    Uniform,
    /// Weights inversely proportional to class frequency
    Balanced,
}

/// Forest hyperparameters. Defaults are the fixed training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::invalid_parameter(
                "n_estimators",
                self.n_estimators,
                "the forest needs at least one tree",
            ));
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::invalid_parameter(
                "max_depth",
                0,
                "must be at least 1 when set",
            ));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::invalid_parameter(
                "min_samples_split",
                self.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.min_samples_leaf < 1 {
            return Err(PipelineError::invalid_parameter(
                "min_samples_leaf",
                self.min_samples_leaf,
                "must be at least 1",
            ));
        }
        match self.max_features {
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(PipelineError::invalid_parameter(
                    "max_features",
                    f,
                    "fraction must lie in (0, 1]",
                ))
            }
            MaxFeatures::Fixed(0) => Err(PipelineError::invalid_parameter(
                "max_features",
                0,
                "must be at least 1",
            )),
            _ => Ok(()),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn resolve_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    class_weights: Vec<f64>,
    feature_importances: Option<Vec<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            class_weights: Vec::new(),
            feature_importances: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit the forest. Tree `i` draws its bootstrap sample and split candidates
    /// from its own RNG seeded with `seed + i`, so results do not depend on
    /// anything but the data and the configuration.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<&mut Self> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::Data(format!(
                "cannot fit on an empty matrix ({n_samples} x {n_features})"
            )));
        }

        if n_samples != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("y length = {n_samples}"),
                actual: format!("y length = {}", y.len()),
            });
        }

        self.class_weights = compute_class_weights(y, self.config.class_weight)?;
        self.n_features = n_features;
        let max_features = self.config.resolve_max_features(n_features);

        debug!(
            n_estimators = self.config.n_estimators,
            max_features,
            class_weights = ?self.class_weights,
            "fitting random forest"
        );

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        for tree_idx in 0..self.config.n_estimators {
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(tree_idx as u64));

            let mut draws = vec![0usize; n_samples];
            if self.config.bootstrap {
                for _ in 0..n_samples {
                    draws[rng.gen_range(0..n_samples)] += 1;
                }
            } else {
                draws.fill(1);
            }

            let weights: Vec<f64> = draws
                .iter()
                .zip(y.iter())
                .map(|(&count, &label)| count as f64 * self.class_weights[label])
                .collect();

            let mut tree = DecisionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_split(self.config.min_samples_split)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_max_features(max_features);
            tree.fit_weighted(x, y, &weights, &mut rng)?;

            debug!(
                tree = tree_idx,
                depth = tree.depth(),
                leaves = tree.n_leaves(),
                "tree fitted"
            );
            trees.push(tree);
        }

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp) {
                    *total += val;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for imp in &mut total_importances {
            *imp /= n_trees;
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(total_importances);
    }

    /// Mean of the trees' leaf class distributions (`n_samples x 2`).
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut proba: Array2<f64> = Array2::zeros((x.nrows(), N_CLASSES));
        for tree in &self.trees {
            proba += &tree.predict_proba(x)?;
        }
        proba /= self.trees.len() as f64;

        Ok(proba)
    }

    /// Probability of the Parkinson's class for each row.
    pub fn predict_positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.column(1).to_owned())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(argmax).collect())
    }

    /// Mean decrease in impurity per feature, summing to 1 unless no tree split.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    pub fn class_weights(&self) -> &[f64] {
        &self.class_weights
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// `n / (n_present_classes * count_c)` for balanced weighting.
fn compute_class_weights(y: &Array1<usize>, strategy: ClassWeight) -> Result<Vec<f64>> {
    let mut counts = [0usize; N_CLASSES];
    for &label in y {
        if label >= N_CLASSES {
            return Err(PipelineError::Data(format!(
                "class label {label} out of range"
            )));
        }
        counts[label] += 1;
    }

    let weights = match strategy {
        ClassWeight::Uniform => vec![1.0; N_CLASSES],
        ClassWeight::Balanced => {
            let present = counts.iter().filter(|&&c| c > 0).count() as f64;
            let n = y.len() as f64;
            counts
                .iter()
                .map(|&c| if c > 0 { n / (present * c as f64) } else { 0.0 })
                .collect()
        }
    };

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_config(n_estimators: usize) -> ForestConfig {
        ForestConfig {
            n_estimators,
            min_samples_split: 2,
            min_samples_leaf: 1,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0, 0, 0, 1, 1, 1];

        let mut rf = RandomForest::new(small_config(10));
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(p, a)| p == a).count();

        assert!(correct >= 5, "Accuracy too low: {correct}/6");
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let x = array![[0.0, 0.0], [0.5, 0.2], [1.0, 1.0], [1.5, 0.7]];
        let y = array![0, 0, 1, 1];

        let mut rf = RandomForest::new(small_config(10));
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (4, 2));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_feature_importances_normalized() {
        let x = array![
            [1.0, 0.3],
            [2.0, 0.1],
            [3.0, 0.2],
            [4.0, 0.3],
            [5.0, 0.1],
            [6.0, 0.2],
        ];
        let y = array![0, 0, 0, 1, 1, 1];

        let mut rf = RandomForest::new(ForestConfig {
            max_features: MaxFeatures::All,
            ..small_config(20)
        });
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances.iter().all(|&v| v >= 0.0));
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let x = array![[0.0, 1.0], [1.0, 0.5], [2.0, 0.2], [3.0, 0.9], [4.0, 0.4], [5.0, 0.1]];
        let y = array![0, 1, 0, 1, 1, 0];

        let mut a = RandomForest::new(small_config(15));
        let mut b = RandomForest::new(small_config(15));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_balanced_class_weights() {
        let y = array![0, 0, 0, 1];
        let weights = compute_class_weights(&y, ClassWeight::Balanced).unwrap();
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[1] - 2.0).abs() < 1e-12);

        let uniform = compute_class_weights(&y, ClassWeight::Uniform).unwrap();
        assert_eq!(uniform, vec![1.0, 1.0]);
    }

    #[test]
    fn test_resolve_max_features() {
        let config = ForestConfig::default();
        assert_eq!(config.resolve_max_features(26), 5);
        assert_eq!(config.resolve_max_features(1), 1);

        let all = ForestConfig {
            max_features: MaxFeatures::All,
            ..ForestConfig::default()
        };
        assert_eq!(all.resolve_max_features(26), 26);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![0, 1];

        let mut rf = RandomForest::new(ForestConfig {
            n_estimators: 0,
            ..ForestConfig::default()
        });
        assert!(matches!(
            rf.fit(&x, &y),
            Err(PipelineError::InvalidParameter { .. })
        ));

        let config = ForestConfig {
            min_samples_split: 1,
            ..ForestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unfitted_and_misaligned() {
        let rf = RandomForest::default();
        assert!(matches!(
            rf.predict(&array![[0.0]]),
            Err(PipelineError::ModelNotFitted)
        ));

        let mut rf = RandomForest::default();
        assert!(matches!(
            rf.fit(&array![[0.0], [1.0]], &array![0]),
            Err(PipelineError::Shape { .. })
        ));
    }
}
