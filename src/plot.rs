//! SVG charts for a training run

use crate::error::{PipelineError, Result};
use crate::importance::FeatureImportance;
use plotters::prelude::*;
use std::path::Path;

pub const ROC_CURVE_FILE: &str = "roc_curve.svg";
pub const IMPORTANCE_FILE: &str = "feature_importance.svg";

fn plot_error(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Plot(err.to_string())
}

pub fn draw_roc_curve(path: &Path, fpr: &[f64], tpr: &[f64], auc: f64) -> Result<()> {
    let root = SVGBackend::new(path, (640, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("ROC curve (AUC = {auc:.4})"), ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(48)
        .build_cartesian_2d(0f64..1f64, 0f64..1f64)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("False positive rate")
        .y_desc("True positive rate")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], BLACK.mix(0.3)))
        .map_err(plot_error)?;
    chart
        .draw_series(LineSeries::new(
            fpr.iter().copied().zip(tpr.iter().copied()),
            BLUE.stroke_width(2),
        ))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Horizontal bars for the first `limit` ranked features, largest on top.
pub fn draw_importances(path: &Path, ranked: &[FeatureImportance], limit: usize) -> Result<()> {
    let shown = &ranked[..limit.min(ranked.len())];
    if shown.is_empty() {
        return Ok(());
    }

    let n = shown.len();
    let max_score = shown.iter().map(|e| e.score).fold(0.0, f64::max).max(1e-9) * 1.1;

    #[allow(clippy::cast_possible_truncation)]
    let height = 96 + 28 * n as u32;
    let root = SVGBackend::new(path, (720, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature importance", ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(140)
        .build_cartesian_2d(0f64..max_score, (0..n).into_segmented())
        .map_err(plot_error)?;

    let formatter = |value: &SegmentValue<usize>| bar_label(shown, value);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&formatter)
        .x_desc("Mean decrease in impurity")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(
            Histogram::horizontal(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(4)
                .data(
                    shown
                        .iter()
                        .enumerate()
                        .map(|(rank, entry)| (n - 1 - rank, entry.score)),
                ),
        )
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Bar `slot` counts from the bottom; the top slot holds rank 0.
fn bar_label(shown: &[FeatureImportance], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(slot) if *slot < shown.len() => {
            shown[shown.len() - 1 - slot].name.clone()
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: f64) -> FeatureImportance {
        FeatureImportance {
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_bar_labels_put_top_rank_highest() {
        let shown = [entry("hnr", 0.6), entry("jitter_local", 0.3), entry("nth", 0.1)];

        assert_eq!(bar_label(&shown, &SegmentValue::CenterOf(2)), "hnr");
        assert_eq!(bar_label(&shown, &SegmentValue::CenterOf(0)), "nth");
        assert_eq!(bar_label(&shown, &SegmentValue::Exact(1)), "");
        assert_eq!(bar_label(&shown, &SegmentValue::CenterOf(3)), "");
    }

    #[test]
    fn test_empty_ranking_draws_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(IMPORTANCE_FILE);

        draw_importances(&path, &[], 10).unwrap();
        assert!(!path.exists());
    }
}
