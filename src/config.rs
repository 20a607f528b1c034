//! Training run configuration
//!
//! Every field has a default, so an empty (or absent) YAML file reproduces the
//! fixed training setup.

use crate::error::{PipelineError, Result};
use crate::persist::{FEATURE_NAMES_FILE, MODEL_FILE};
use crate::random_forest::ForestConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Rows produced by the synthetic provider
    pub n_samples: usize,
    /// Seed for data generation and the train/test split
    pub seed: u64,
    pub test_fraction: f64,
    /// Rows of the importance table shown in the report
    pub top_k: usize,
    pub forest: ForestConfig,
    /// CSV file to train on instead of synthetic data
    pub data: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub model_file: String,
    pub feature_names_file: String,
    /// Directory for SVG charts; no charts when unset
    pub plots_dir: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            seed: 42,
            test_fraction: 0.2,
            top_k: 10,
            forest: ForestConfig::default(),
            data: None,
            output_dir: PathBuf::from("."),
            model_file: MODEL_FILE.to_string(),
            feature_names_file: FEATURE_NAMES_FILE.to_string(),
            plots_dir: None,
        }
    }
}

impl TrainingConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data.is_none() && self.n_samples == 0 {
            return Err(PipelineError::invalid_parameter(
                "n_samples",
                self.n_samples,
                "at least one sample is required",
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::invalid_parameter(
                "test_fraction",
                self.test_fraction,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.model_file.is_empty() || self.feature_names_file.is_empty() {
            return Err(PipelineError::Config(
                "output file names must not be empty".to_string(),
            ));
        }
        if self.model_file == self.feature_names_file {
            return Err(PipelineError::Config(format!(
                "model and feature-name files must differ (both '{}')",
                self.model_file
            )));
        }
        self.forest.validate()
    }

    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join(&self.model_file)
    }

    pub fn feature_names_path(&self) -> PathBuf {
        self.output_dir.join(&self.feature_names_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_forest::{ClassWeight, MaxFeatures};

    #[test]
    fn test_defaults_match_training_setup() {
        let config = TrainingConfig::default();

        assert_eq!(config.n_samples, 1000);
        assert_eq!(config.seed, 42);
        assert!((config.test_fraction - 0.2).abs() < 1e-12);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.forest.max_depth, Some(10));
        assert_eq!(config.forest.min_samples_split, 5);
        assert_eq!(config.forest.min_samples_leaf, 2);
        assert_eq!(config.forest.max_features, MaxFeatures::Sqrt);
        assert_eq!(config.forest.class_weight, ClassWeight::Balanced);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.model_path(), PathBuf::from(".").join("pd_model.pkl"));
        assert_eq!(
            config.feature_names_path(),
            PathBuf::from(".").join("feature_names.pkl")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "n_samples: 300\nforest:\n  n_estimators: 25\n  class_weight: uniform\n";
        let config = TrainingConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.n_samples, 300);
        assert_eq!(config.forest.n_estimators, 25);
        assert_eq!(config.forest.class_weight, ClassWeight::Uniform);
        assert_eq!(config.forest.max_depth, Some(10));
        assert_eq!(config.model_file, MODEL_FILE);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(
            TrainingConfig::from_yaml_str("  \n").unwrap(),
            TrainingConfig::default()
        );
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            TrainingConfig::from_yaml_str("n_samples: [oops"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_fraction = TrainingConfig {
            test_fraction: 1.5,
            ..TrainingConfig::default()
        };
        assert!(bad_fraction.validate().is_err());

        let same_files = TrainingConfig {
            feature_names_file: MODEL_FILE.to_string(),
            ..TrainingConfig::default()
        };
        assert!(same_files.validate().is_err());

        let mut no_trees = TrainingConfig::default();
        no_trees.forest.n_estimators = 0;
        assert!(no_trees.validate().is_err());
    }

    #[test]
    fn test_paths_join_output_dir() {
        let config = TrainingConfig {
            output_dir: PathBuf::from("/tmp/run"),
            ..TrainingConfig::default()
        };
        assert_eq!(config.model_path(), PathBuf::from("/tmp/run").join(MODEL_FILE));
    }
}
