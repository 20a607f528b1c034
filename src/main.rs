use anyhow::Context;
use clap::Parser;
use pd_voice::{
    dataset::Diagnosis, importance::ImportanceTable, pipeline::TrainingOutcome, TrainingConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Train the Parkinson's voice classifier and write the model files.
#[derive(Debug, Parser)]
#[command(name = "pd-voice", version, about)]
struct Cli {
    /// CSV with the voice-feature columns and a `status` label column
    #[arg(long)]
    data: Option<PathBuf>,

    /// YAML training configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the model and feature-name files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for ROC and importance charts
    #[arg(long)]
    plots_dir: Option<PathBuf>,
}

impl Cli {
    fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TrainingConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data = Some(data.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(dir) = &self.plots_dir {
            config.plots_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

fn print_report(outcome: &TrainingOutcome, top_k: usize) {
    let (rows, columns) = outcome.dataset_shape;
    println!("Dataset shape: ({rows}, {columns})");
    for class in Diagnosis::ALL {
        println!(
            "  {:<12} {}",
            class.display_name(),
            outcome.class_counts[class.label()]
        );
    }
    println!(
        "Train size: {}, test size: {}",
        outcome.train_size, outcome.test_size
    );

    let evaluation = &outcome.evaluation;
    println!();
    println!("Accuracy: {:.4}", evaluation.accuracy);
    println!("ROC-AUC: {:.4}", evaluation.roc_auc);
    println!();
    println!("Classification report:");
    println!("{}", evaluation.report);
    println!("Confusion matrix:");
    println!("{}", evaluation.confusion);

    println!("Top {top_k} features:");
    println!(
        "{}",
        ImportanceTable {
            entries: &outcome.importances,
            limit: top_k,
        }
    );

    let artifacts = &outcome.artifacts;
    println!("Model saved to {}", artifacts.model_path.display());
    println!(
        "Feature names saved to {}",
        artifacts.feature_names_path.display()
    );
    for chart in &artifacts.plots {
        println!("Chart saved to {}", chart.display());
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pd_voice=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.training_config()?;

    match pd_voice::run(&config) {
        Ok(outcome) => {
            print_report(&outcome, config.top_k);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Error during training: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
