use crate::error::{PipelineError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance {
    pub name: String,
    pub score: f64,
}

/// Pairs `names` with `scores` and sorts by descending score. Equal scores keep
/// schema order.
pub fn rank_features(names: &[String], scores: &[f64]) -> Result<Vec<FeatureImportance>> {
    if names.len() != scores.len() {
        return Err(PipelineError::SchemaMismatch {
            names: names.len(),
            scores: scores.len(),
        });
    }

    if let Some((name, score)) = names
        .iter()
        .zip(scores)
        .find(|(_, s)| !s.is_finite() || **s < 0.0)
    {
        return Err(PipelineError::Data(format!(
            "importance of '{name}' must be finite and non-negative, got {score}"
        )));
    }

    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(scores)
        .map(|(name, &score)| FeatureImportance {
            name: name.clone(),
            score,
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(ranked)
}

/// Two-column table of the first `limit` entries.
pub struct ImportanceTable<'a> {
    pub entries: &'a [FeatureImportance],
    pub limit: usize,
}

impl fmt::Display for ImportanceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.entries[..self.limit.min(self.entries.len())];
        let width = shown
            .iter()
            .map(|e| e.name.len())
            .max()
            .unwrap_or(0)
            .max("feature".len());

        writeln!(f, "{:>width$}  {:>10}", "feature", "importance")?;
        for entry in shown {
            writeln!(f, "{:>width$}  {:>10.6}", entry.name, entry.score)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_sorted_descending() {
        let ranked = rank_features(&names(&["a", "b", "c"]), &[0.2, 0.5, 0.3]).unwrap();
        let order: Vec<&str> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ties_keep_schema_order() {
        let ranked =
            rank_features(&names(&["x", "y", "z", "w"]), &[0.25, 0.25, 0.5, 0.0]).unwrap();
        let order: Vec<&str> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec!["z", "x", "y", "w"]);
    }

    #[test]
    fn test_length_mismatch() {
        let err = rank_features(&names(&["a", "b"]), &[1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { names: 2, scores: 1 }));
    }

    #[test]
    fn test_negative_score_rejected() {
        assert!(rank_features(&names(&["a"]), &[-0.1]).is_err());
        assert!(rank_features(&names(&["a"]), &[f64::NAN]).is_err());
    }

    #[test]
    fn test_table_limit() {
        let ranked = rank_features(&names(&["alpha", "beta", "gamma"]), &[0.1, 0.6, 0.3]).unwrap();
        let text = ImportanceTable {
            entries: &ranked,
            limit: 2,
        }
        .to_string();

        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("beta"));
        assert!(!text.contains("alpha"));
    }
}
