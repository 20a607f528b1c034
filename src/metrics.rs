//! Evaluation metrics for the binary healthy / Parkinson's classifier

use crate::dataset::{Diagnosis, N_CLASSES};
use crate::error::{PipelineError, Result};
use ndarray::Array1;
use std::fmt;

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<f64> {
    check_aligned(y_true.len(), y_pred.len())?;

    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve of `scores` as a ranking of the positive class.
///
/// Rows with equal scores are treated as a single threshold step, so a constant
/// score yields exactly 0.5.
pub fn roc_auc(y_true: &Array1<usize>, scores: &Array1<f64>) -> Result<f64> {
    let (fpr, tpr) = roc_curve(y_true, scores)?;

    let auc: f64 = fpr
        .windows(2)
        .zip(tpr.windows(2))
        .map(|(f, t)| (f[1] - f[0]) * (t[1] + t[0]) / 2.0)
        .sum();

    Ok(auc)
}

/// ROC points `(fpr, tpr)` from (0, 0) to (1, 1), one per distinct score.
#[allow(clippy::float_cmp)]
pub fn roc_curve(y_true: &Array1<usize>, scores: &Array1<f64>) -> Result<(Vec<f64>, Vec<f64>)> {
    check_aligned(y_true.len(), scores.len())?;

    let positive = Diagnosis::Parkinsons.label();
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(y_true.iter())
        .map(|(&s, &t)| (s, t == positive))
        .collect();

    if let Some((s, _)) = pairs.iter().find(|(s, _)| !s.is_finite()) {
        return Err(PipelineError::Data(format!("non-finite score {s}")));
    }

    let n_pos = pairs.iter().filter(|(_, t)| *t).count() as f64;
    let n_neg = pairs.len() as f64 - n_pos;

    if n_pos == 0.0 || n_neg == 0.0 {
        return Err(PipelineError::UndefinedMetric(
            "ROC-AUC needs both classes present in y_true".to_string(),
        ));
    }

    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut fprs = vec![0.0];
    let mut tprs = vec![0.0];
    let mut tp = 0.0;
    let mut fp = 0.0;

    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        while i < pairs.len() && pairs[i].0 == score {
            if pairs[i].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        fprs.push(fp / n_neg);
        tprs.push(tp / n_pos);
    }

    Ok((fprs, tprs))
}

fn check_aligned(expected: usize, actual: usize) -> Result<()> {
    if expected == 0 {
        return Err(PipelineError::Data(
            "cannot evaluate on an empty set".to_string(),
        ));
    }
    if expected != actual {
        return Err(PipelineError::Shape {
            expected: format!("{expected} predictions"),
            actual: format!("{actual} predictions"),
        });
    }
    Ok(())
}

/// Counts indexed `[true][predicted]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub counts: [[usize; N_CLASSES]; N_CLASSES],
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<Self> {
        check_aligned(y_true.len(), y_pred.len())?;

        let mut counts = [[0; N_CLASSES]; N_CLASSES];
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t >= N_CLASSES || p >= N_CLASSES {
                return Err(PipelineError::Data(format!(
                    "class label out of range (true {t}, predicted {p})"
                )));
            }
            counts[t][p] += 1;
        }

        Ok(Self { counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>24}{:>12}{:>12}", "", "pred Healthy", "pred PD")?;
        for class in Diagnosis::ALL {
            let row = self.counts[class.label()];
            writeln!(
                f,
                "{:>24}{:>12}{:>12}",
                format!("true {}", class.display_name()),
                row[0],
                row[1]
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision / recall / F1 plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: [ClassScores; N_CLASSES],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn from_confusion(confusion: &ConfusionMatrix) -> Self {
        let counts = &confusion.counts;
        let total = confusion.total();

        let classes: [ClassScores; N_CLASSES] = std::array::from_fn(|c| {
            let tp = counts[c][c];
            let predicted: usize = counts.iter().map(|row| row[c]).sum();
            let support: usize = counts[c].iter().sum();

            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassScores {
                precision,
                recall,
                f1,
                support,
            }
        });

        let correct: usize = (0..N_CLASSES).map(|c| counts[c][c]).sum();

        let macro_avg = average(&classes, |_| 1.0 / N_CLASSES as f64, total);
        let weighted_avg = average(&classes, |s| ratio(s.support, total), total);

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, diagnosis: Diagnosis) -> &ClassScores {
        &self.classes[diagnosis.label()]
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn average(
    classes: &[ClassScores],
    weight: impl Fn(&ClassScores) -> f64,
    total: usize,
) -> ClassScores {
    let mut avg = ClassScores {
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
        support: total,
    };
    for scores in classes {
        let w = weight(scores);
        avg.precision += w * scores.precision;
        avg.recall += w * scores.recall;
        avg.f1 += w * scores.f1;
    }
    avg
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WIDTH: usize = 12;

        writeln!(
            f,
            "{:>WIDTH$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for class in Diagnosis::ALL {
            let s = self.class(class);
            writeln!(
                f,
                "{:>WIDTH$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.display_name(),
                s.precision,
                s.recall,
                s.f1,
                s.support
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>WIDTH$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.weighted_avg.support
        )?;
        for (name, s) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>WIDTH$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, s.precision, s.recall, s.f1, s.support
            )?;
        }

        Ok(())
    }
}

/// Everything computed on the held-out set
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub roc_auc: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

impl Evaluation {
    pub fn compute(
        y_true: &Array1<usize>,
        y_pred: &Array1<usize>,
        positive_scores: &Array1<f64>,
    ) -> Result<Self> {
        let confusion = ConfusionMatrix::from_predictions(y_true, y_pred)?;

        Ok(Self {
            accuracy: accuracy(y_true, y_pred)?,
            roc_auc: roc_auc(y_true, positive_scores)?,
            report: ClassificationReport::from_confusion(&confusion),
            confusion,
        })
    }
}
