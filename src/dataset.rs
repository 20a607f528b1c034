//! Voice feature schema and the labelled dataset container

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use std::fmt;

pub const DIMENSIONS: usize = 26;

/// Fixed column order of every feature matrix and of the persisted schema.
pub const FEATURE_NAMES: [&str; DIMENSIONS] = [
    "jitter_local",
    "jitter_abs",
    "jitter_rap",
    "jitter_ppq5",
    "jitter_ddp",
    "shimmer_local",
    "shimmer_db",
    "shimmer_apq3",
    "shimmer_apq5",
    "shimmer_apq11",
    "shimmer_dda",
    "hnr",
    "nth",
    "htn",
    "median_pitch",
    "mean_pitch",
    "std_pitch",
    "min_pitch",
    "max_pitch",
    "pulses",
    "periods",
    "mean_period",
    "sd_period",
    "fraction_unvoiced",
    "num_breaks",
    "degree_breaks",
];

pub const N_CLASSES: usize = 2;

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| (*name).to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    Healthy,
    Parkinsons,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; N_CLASSES] = [Diagnosis::Healthy, Diagnosis::Parkinsons];

    pub fn label(self) -> usize {
        match self {
            Diagnosis::Healthy => 0,
            Diagnosis::Parkinsons => 1,
        }
    }

    pub fn from_label(label: usize) -> Option<Self> {
        match label {
            0 => Some(Diagnosis::Healthy),
            1 => Some(Diagnosis::Parkinsons),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Diagnosis::Healthy => "Healthy",
            Diagnosis::Parkinsons => "Parkinson's",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Feature matrix, aligned label vector and the column names.
///
/// Rows of `features` and entries of `labels` correspond by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<usize>,
    feature_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset over the fixed voice schema.
    pub fn new(features: Array2<f64>, labels: Array1<usize>) -> Result<Self> {
        Self::with_feature_names(features, labels, feature_names())
    }

    pub fn with_feature_names(
        features: Array2<f64>,
        labels: Array1<usize>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }

        if features.ncols() != feature_names.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} feature columns", feature_names.len()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }

        if let Some(((row, col), value)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::Data(format!(
                "non-finite value {value} at row {row}, column '{}'",
                feature_names[col]
            )));
        }

        if let Some((row, label)) = labels.iter().enumerate().find(|(_, &l)| l >= N_CLASSES) {
            return Err(PipelineError::Data(format!(
                "label {label} at row {row} is not a valid class (expected 0 or 1)"
            )));
        }

        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.features.dim()
    }

    pub fn class_counts(&self) -> [usize; N_CLASSES] {
        let mut counts = [0; N_CLASSES];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    pub fn positive_fraction(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.class_counts()[Diagnosis::Parkinsons.label()] as f64 / self.labels.len() as f64
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn test_schema_has_unique_names() {
        let mut sorted = FEATURE_NAMES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), DIMENSIONS);
        assert_eq!(FEATURE_NAMES[0], "jitter_local");
        assert_eq!(FEATURE_NAMES[5], "shimmer_local");
        assert_eq!(FEATURE_NAMES[11], "hnr");
    }

    #[test]
    fn test_misaligned_labels_rejected() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![0];

        let err = Dataset::with_feature_names(x, y, names(2)).unwrap_err();
        assert!(matches!(err, PipelineError::Shape { .. }));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let x = Array2::zeros((3, 4));
        let y = array![0, 1, 0];

        assert!(Dataset::new(x, y).is_err());
    }

    #[test]
    fn test_non_finite_and_bad_labels_rejected() {
        let x = array![[1.0, f64::NAN]];
        assert!(matches!(
            Dataset::with_feature_names(x, array![0], names(2)),
            Err(PipelineError::Data(_))
        ));

        let x = array![[1.0, 2.0]];
        assert!(matches!(
            Dataset::with_feature_names(x, array![2], names(2)),
            Err(PipelineError::Data(_))
        ));
    }

    #[test]
    fn test_class_counts_and_select() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0, 1, 1, 1];
        let data = Dataset::with_feature_names(x, y, names(1)).unwrap();

        assert_eq!(data.class_counts(), [1, 3]);
        assert!((data.positive_fraction() - 0.75).abs() < 1e-12);

        let subset = data.select(&[3, 0]);
        assert_eq!(subset.features(), &array![[3.0], [0.0]]);
        assert_eq!(subset.labels(), &array![1, 0]);
    }

    #[test]
    fn test_diagnosis_labels() {
        for diagnosis in Diagnosis::ALL {
            assert_eq!(Diagnosis::from_label(diagnosis.label()), Some(diagnosis));
        }
        assert_eq!(Diagnosis::from_label(7), None);
        assert_eq!(Diagnosis::Parkinsons.to_string(), "Parkinson's");
    }
}
