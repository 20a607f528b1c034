//! Synthetic voice-feature data
//!
//! Placeholder provider until a real recording dataset is available: standard
//! normal noise with a mean shift on three features for Parkinson's samples.

use crate::dataset::{Dataset, Diagnosis, DIMENSIONS};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Per-feature shift applied to positive samples: (column, offset).
pub const PARKINSONS_SHIFTS: [(usize, f64); 3] = [
    // jitter_local
    (0, 0.5),
    // shimmer_local
    (5, 0.3),
    // hnr
    (11, -5.0),
];

pub fn generate(n_samples: usize, seed: u64) -> Result<Dataset> {
    if n_samples == 0 {
        return Err(PipelineError::Data(
            "cannot generate a dataset with zero samples".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut features: Array2<f64> =
        Array2::from_shape_simple_fn((n_samples, DIMENSIONS), || rng.sample(StandardNormal));

    let labels: Array1<usize> = (0..n_samples).map(|_| rng.gen_range(0..2)).collect();

    for (mut row, &label) in features.rows_mut().into_iter().zip(labels.iter()) {
        if label == Diagnosis::Parkinsons.label() {
            for (column, offset) in PARKINSONS_SHIFTS {
                row[column] += offset;
            }
        }
    }

    Dataset::new(features, labels)
}
