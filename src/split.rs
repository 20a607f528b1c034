//! Stratified train/test split

use crate::dataset::{Dataset, N_CLASSES};
use crate::error::{PipelineError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Partitions `data` so that each class keeps (approximately) its share in both
/// halves. The test half holds `ceil(test_fraction * n)` rows.
pub fn stratified_split(data: &Dataset, test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::invalid_parameter(
            "test_fraction",
            test_fraction,
            "must lie strictly between 0 and 1",
        ));
    }

    let n_samples = data.n_samples();

    let mut class_indices: Vec<Vec<usize>> = vec![Vec::new(); N_CLASSES];
    for (i, &label) in data.labels().iter().enumerate() {
        class_indices[label].push(i);
    }
    class_indices.retain(|indices| !indices.is_empty());
    let n_classes = class_indices.len();

    if let Some(smallest) = class_indices.iter().map(Vec::len).min() {
        if smallest < 2 {
            return Err(PipelineError::Stratification(format!(
                "the least populated class has only {smallest} member; at least 2 are required"
            )));
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let n_test = (test_fraction * n_samples as f64).ceil() as usize;
    let n_train = n_samples - n_test;

    if n_test < n_classes || n_train < n_classes {
        return Err(PipelineError::Stratification(format!(
            "{n_test} test / {n_train} train rows cannot hold all {n_classes} classes"
        )));
    }

    let counts: Vec<usize> = class_indices.iter().map(Vec::len).collect();
    let allocation = allocate(&counts, n_test, n_samples)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(n_train);
    let mut test_indices = Vec::with_capacity(n_test);

    for (indices, &take) in class_indices.iter_mut().zip(&allocation) {
        indices.shuffle(&mut rng);
        test_indices.extend_from_slice(&indices[..take]);
        train_indices.extend_from_slice(&indices[take..]);
    }

    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    Ok(Split {
        train: data.select(&train_indices),
        test: data.select(&test_indices),
    })
}

/// Largest-remainder apportionment of `total` rows across classes, then
/// adjusted so every class keeps at least one row on each side.
fn allocate(counts: &[usize], total: usize, n_samples: usize) -> Result<Vec<usize>> {
    let quotas: Vec<f64> = counts
        .iter()
        .map(|&c| total as f64 * c as f64 / n_samples as f64)
        .collect();

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let mut allocation: Vec<usize> = quotas
        .iter()
        .zip(counts)
        .map(|(q, &c)| (q.floor() as usize).min(c))
        .collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut remaining = total.saturating_sub(allocation.iter().sum());
    while remaining > 0 {
        let before = remaining;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if allocation[class] < counts[class] {
                allocation[class] += 1;
                remaining -= 1;
            }
        }
        if remaining == before {
            break;
        }
    }

    for class in 0..counts.len() {
        if allocation[class] == 0 {
            let donor = (0..counts.len())
                .filter(|&c| allocation[c] > 1)
                .max_by_key(|&c| (allocation[c], std::cmp::Reverse(c)))
                .ok_or_else(|| no_room(class, "test"))?;
            allocation[donor] -= 1;
            allocation[class] += 1;
        }
        if allocation[class] >= counts[class] {
            let receiver = (0..counts.len())
                .filter(|&c| allocation[c] + 1 < counts[c])
                .max_by_key(|&c| (counts[c] - allocation[c], std::cmp::Reverse(c)))
                .ok_or_else(|| no_room(class, "train"))?;
            allocation[class] -= 1;
            allocation[receiver] += 1;
        }
    }

    Ok(allocation)
}

fn no_room(class: usize, side: &str) -> PipelineError {
    PipelineError::Stratification(format!(
        "class {class} cannot be given a {side} row without emptying another class"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;
    use ndarray::Array2;
    use std::collections::HashSet;

    fn toy(labels: Vec<usize>) -> Dataset {
        let n = labels.len();
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        Dataset::with_feature_names(x, labels.into(), vec!["id".to_string()]).unwrap()
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let data = synthetic::generate(1000, 42).unwrap();
        let split = stratified_split(&data, 0.2, 42).unwrap();

        assert_eq!(split.train.n_samples(), 800);
        assert_eq!(split.test.n_samples(), 200);

        let full = data.positive_fraction();
        assert!((split.train.positive_fraction() - full).abs() < 0.01);
        assert!((split.test.positive_fraction() - full).abs() < 0.01);
    }

    #[test]
    fn test_rows_are_partitioned() {
        let labels: Vec<usize> = (0..37).map(|i| usize::from(i % 3 == 0)).collect();
        let data = toy(labels);
        let split = stratified_split(&data, 0.25, 7).unwrap();

        let train: HashSet<u64> = split.train.features().iter().map(|v| v.to_bits()).collect();
        let test: HashSet<u64> = split.test.features().iter().map(|v| v.to_bits()).collect();

        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 37);
        assert_eq!(split.test.n_samples(), 10);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = synthetic::generate(100, 3).unwrap();
        let a = stratified_split(&data, 0.2, 11).unwrap();
        let b = stratified_split(&data, 0.2, 11).unwrap();

        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn test_class_with_one_member_fails() {
        let data = toy(vec![0, 0, 0, 0, 1]);
        let err = stratified_split(&data, 0.4, 0).err().unwrap();
        assert!(matches!(err, PipelineError::Stratification(_)));
    }

    #[test]
    fn test_test_half_too_small_fails() {
        let data = toy(vec![0, 0, 1, 1]);
        assert!(matches!(
            stratified_split(&data, 0.1, 0),
            Err(PipelineError::Stratification(_))
        ));
    }

    #[test]
    fn test_invalid_fraction() {
        let data = toy(vec![0, 1, 0, 1]);
        for fraction in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                stratified_split(&data, fraction, 0),
                Err(PipelineError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_allocation_sums_to_total() {
        assert_eq!(allocate(&[3, 7], 3, 10).unwrap(), vec![1, 2]);
        assert_eq!(allocate(&[50, 50], 20, 100).unwrap(), vec![10, 10]);
        let alloc = allocate(&[2, 2, 2], 3, 6).unwrap();
        assert_eq!(alloc, vec![1, 1, 1]);
    }

    #[test]
    fn test_allocation_keeps_every_class_on_both_sides() {
        assert_eq!(allocate(&[2, 98], 20, 100).unwrap(), vec![1, 19]);
        assert_eq!(allocate(&[2, 8], 8, 10).unwrap(), vec![1, 7]);
        assert!(matches!(
            allocate(&[2, 2], 3, 4),
            Err(PipelineError::Stratification(_))
        ));
    }

    #[test]
    fn test_rare_class_reaches_test_half() {
        let mut labels = vec![0; 2];
        labels.extend(vec![1; 98]);
        let split = stratified_split(&toy(labels), 0.2, 42).unwrap();

        assert_eq!(split.test.n_samples(), 20);
        assert_eq!(split.test.class_counts(), [1, 19]);
        assert_eq!(split.train.class_counts(), [1, 79]);
    }
}
