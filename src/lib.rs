//! Parkinson's screening from voice features
//!
//! Trains a random-forest classifier on jitter / shimmer / pitch / periodicity
//! statistics, evaluates it on a stratified hold-out set and writes the fitted
//! model together with its feature schema.
//!
//! - [`synthetic`] and [`parse`] - data providers
//! - [`split`] - stratified train/test split
//! - [`decision_tree`], [`random_forest`] - the classifier
//! - [`metrics`], [`importance`] - evaluation and feature ranking
//! - [`persist`] - model and schema files
//! - [`pipeline`] - the whole run

pub mod config;
pub mod dataset;
pub mod decision_tree;
pub mod error;
pub mod importance;
pub mod metrics;
pub mod parse;
pub mod persist;
pub mod pipeline;
pub mod plot;
pub mod random_forest;
pub mod split;
pub mod synthetic;

pub use config::TrainingConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{run, TrainingOutcome};
