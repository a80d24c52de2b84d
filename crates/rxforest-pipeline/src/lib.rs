//! The drug-classification pipeline: preprocessing and random forest
//! fitted together, test-set evaluation, trusted artifact persistence,
//! and the end-to-end training run.

mod config;
mod error;
mod evaluate;
mod pipeline;
mod run;
mod serialize;

pub use config::{CONFUSION_IMAGE_FILE, METRICS_FILE, TrainConfig};
pub use error::PipelineError;
pub use evaluate::Evaluation;
pub use pipeline::{Pipeline, PipelineConfig, ScoredPrediction};
pub use run::{TrainReport, run_prediction, run_scored_prediction, run_training};
