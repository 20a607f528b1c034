//! End-to-end training run: data, split, fit, evaluate, rank, persist

use crate::config::TrainingConfig;
use crate::dataset::{Dataset, Diagnosis, N_CLASSES};
use crate::error::Result;
use crate::importance::{rank_features, FeatureImportance};
use crate::metrics::{roc_curve, Evaluation};
use crate::random_forest::RandomForest;
use crate::split::stratified_split;
use crate::{parse, persist, plot, synthetic};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Forward-only progress of a run; any error stops it where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    DataReady,
    Split,
    Trained,
    Evaluated,
    Ranked,
    Persisted,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::DataReady => "data-ready",
            Stage::Split => "split",
            Stage::Trained => "trained",
            Stage::Evaluated => "evaluated",
            Stage::Ranked => "ranked",
            Stage::Persisted => "persisted",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Artifacts {
    pub model_path: PathBuf,
    pub feature_names_path: PathBuf,
    pub plots: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub feature_names: Vec<String>,
    pub dataset_shape: (usize, usize),
    pub class_counts: [usize; N_CLASSES],
    pub train_size: usize,
    pub test_size: usize,
    pub evaluation: Evaluation,
    pub importances: Vec<FeatureImportance>,
    pub artifacts: Artifacts,
    pub stage: Stage,
}

struct Progress {
    stage: Stage,
}

impl Progress {
    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {next} after {}", self.stage);
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }
}

pub fn load_data(config: &TrainingConfig) -> Result<Dataset> {
    match &config.data {
        Some(path) => {
            info!(path = %path.display(), "Loading dataset from CSV");
            parse::parse(path)
        }
        None => {
            info!(
                n_samples = config.n_samples,
                seed = config.seed,
                "Creating synthetic data for demonstration"
            );
            synthetic::generate(config.n_samples, config.seed)
        }
    }
}

pub fn run(config: &TrainingConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    let mut progress = Progress { stage: Stage::Start };

    let data = load_data(config)?;
    let dataset_shape = data.shape();
    let class_counts = data.class_counts();
    info!(
        rows = dataset_shape.0,
        columns = dataset_shape.1,
        healthy = class_counts[Diagnosis::Healthy.label()],
        parkinsons = class_counts[Diagnosis::Parkinsons.label()],
        "Dataset ready"
    );
    progress.advance(Stage::DataReady);

    let split = stratified_split(&data, config.test_fraction, config.seed)?;
    info!(
        train = split.train.n_samples(),
        test = split.test.n_samples(),
        "Split data (stratified)"
    );
    progress.advance(Stage::Split);

    info!(
        n_estimators = config.forest.n_estimators,
        max_depth = ?config.forest.max_depth,
        "Training Random Forest model"
    );
    let started = Instant::now();
    let mut model = RandomForest::new(config.forest.clone());
    model.fit(split.train.features(), split.train.labels())?;
    info!(
        trees = model.n_trees(),
        elapsed = ?started.elapsed(),
        "Model trained"
    );
    progress.advance(Stage::Trained);

    let y_pred = model.predict(split.test.features())?;
    let scores = model.predict_positive_proba(split.test.features())?;
    let evaluation = Evaluation::compute(split.test.labels(), &y_pred, &scores)?;
    info!(
        accuracy = %format!("{:.4}", evaluation.accuracy),
        roc_auc = %format!("{:.4}", evaluation.roc_auc),
        "Model evaluated"
    );
    progress.advance(Stage::Evaluated);

    let importance_scores = model.feature_importances().unwrap_or_default();
    let importances = rank_features(data.feature_names(), importance_scores)?;
    progress.advance(Stage::Ranked);

    std::fs::create_dir_all(&config.output_dir)?;

    let model_path = config.model_path();
    persist::save_model(&model_path, &model)?;
    info!(path = %model_path.display(), "Model saved");

    let feature_names_path = config.feature_names_path();
    persist::save_feature_names(&feature_names_path, data.feature_names())?;
    info!(path = %feature_names_path.display(), "Feature names saved");
    progress.advance(Stage::Persisted);

    let mut plots = Vec::new();
    if let Some(dir) = &config.plots_dir {
        std::fs::create_dir_all(dir)?;

        let roc_path = dir.join(plot::ROC_CURVE_FILE);
        let (fpr, tpr) = roc_curve(split.test.labels(), &scores)?;
        plot::draw_roc_curve(&roc_path, &fpr, &tpr, evaluation.roc_auc)?;
        plots.push(roc_path);

        let importance_path = dir.join(plot::IMPORTANCE_FILE);
        plot::draw_importances(&importance_path, &importances, config.top_k)?;
        plots.push(importance_path);

        info!(dir = %dir.display(), "Charts written");
    }

    progress.advance(Stage::Done);
    info!("Training completed successfully");

    Ok(TrainingOutcome {
        model,
        feature_names: data.feature_names().to_vec(),
        dataset_shape,
        class_counts,
        train_size: split.train.n_samples(),
        test_size: split.test.n_samples(),
        evaluation,
        importances,
        artifacts: Artifacts {
            model_path,
            feature_names_path,
            plots,
        },
        stage: progress.stage,
    })
}
