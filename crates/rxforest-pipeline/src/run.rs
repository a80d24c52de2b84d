//! End-to-end train and predict runs.

use std::path::{Path, PathBuf};

use rxforest_io::{ConfusionPlot, CsvLoader, MetricsWriter};
use rxforest_prep::{Cell, shuffle_rows, train_test_split};
use rxforest_rf::RankedFeature;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::PipelineError;
use crate::config::TrainConfig;
use crate::evaluate::Evaluation;
use crate::pipeline::{Pipeline, ScoredPrediction};

/// What a training run produced.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub classes: Vec<String>,
    /// Rows are true classes, columns predicted, both in `classes` order.
    pub confusion: Vec<Vec<usize>>,
    pub importances: Vec<RankedFeature>,
    pub metrics_path: PathBuf,
    pub confusion_image_path: PathBuf,
    pub model_path: PathBuf,
}

/// Load, split, fit, evaluate, write the reports, and persist the pipeline.
///
/// Output directories must already exist. After saving, the pipeline is
/// loaded back and must reproduce the test-set predictions.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PipelineError::OutputDirMissing`] | Results or model directory missing |
/// | [`PipelineError::Io`] | CSV unreadable, report or image not written |
/// | [`PipelineError::Prep`] | Missing label column, bad split, preprocessing failure |
/// | [`PipelineError::Rf`] | Invalid forest settings or training failure |
/// | [`PipelineError::RoundTripMismatch`] | Reloaded pipeline predicts differently |
/// | others | Artifact save or load failures |
#[instrument(skip_all, fields(data = %config.data_path.display()))]
pub fn run_training(config: &TrainConfig) -> Result<TrainReport, PipelineError> {
    require_dir(&config.results_dir)?;
    if let Some(parent) = config.model_path.parent()
        && !parent.as_os_str().is_empty()
    {
        require_dir(parent)?;
    }
    let pipeline_config = config.pipeline_config()?;

    // 1. Load and shuffle
    let mut frame = CsvLoader::new(&config.data_path).read()?;
    if config.shuffle_seed.is_none() {
        warn!("shuffling without a seed; row order and results vary between runs");
    }
    shuffle_rows(&mut frame, config.shuffle_seed);
    let (features, labels) = frame.split_off_label(&config.label_column)?;

    // 2. Split
    let split = train_test_split(features.n_rows(), config.test_fraction, config.split_seed)?;
    let train_rows = select(features.rows(), &split.train);
    let train_labels = select(&labels, &split.train);
    let test_rows = select(features.rows(), &split.test);
    let test_labels = select(&labels, &split.test);
    info!(n_train = split.n_train(), n_test = split.n_test(), "split dataset");

    // 3. Fit on training rows only
    let pipeline = Pipeline::fit(&train_rows, features.columns(), &train_labels, &pipeline_config)?;

    // 4. Evaluate on the held-out rows
    let predictions = pipeline.predict(&test_rows)?;
    let evaluation = Evaluation::compute(&test_labels, &predictions, pipeline.classes())?;
    info!(
        accuracy = evaluation.accuracy(),
        macro_f1 = evaluation.macro_f1(),
        "test set scored"
    );
    debug!("confusion matrix, rows true, columns predicted:\n{}", evaluation.confusion());

    // 5. Reports
    let metrics_path = config.metrics_path();
    MetricsWriter::write(&metrics_path, evaluation.accuracy(), evaluation.macro_f1())?;
    let confusion_image_path = config.confusion_image_path();
    ConfusionPlot::new(evaluation.confusion().as_rows(), pipeline.classes())
        .with_dpi(config.dpi)
        .save(&confusion_image_path)?;

    // 6. Persist and verify
    pipeline.save(&config.model_path)?;
    let reloaded = Pipeline::load(&config.model_path)?;
    verify_round_trip(&predictions, &reloaded.predict(&test_rows)?)?;
    info!(path = %config.model_path.display(), "pipeline persisted and verified");

    Ok(TrainReport {
        n_rows: features.n_rows(),
        n_train: split.n_train(),
        n_test: split.n_test(),
        accuracy: evaluation.accuracy(),
        macro_f1: evaluation.macro_f1(),
        classes: pipeline.classes().to_vec(),
        confusion: evaluation.confusion().as_rows().to_vec(),
        importances: pipeline.importances().to_vec(),
        metrics_path,
        confusion_image_path,
        model_path: config.model_path.clone(),
    })
}

/// Predict a class for every row of a CSV with a saved pipeline.
///
/// Columns are matched by name to the ones the pipeline was fitted on, so
/// extra columns (including `label_column`, when given) are ignored.
///
/// # Errors
///
/// Artifact load failures, [`PipelineError::Io`] for an unreadable CSV,
/// [`PipelineError::Prep`] for missing columns or unknown categories.
#[instrument(skip_all, fields(model = %model_path.display(), data = %data_path.display()))]
pub fn run_prediction(
    model_path: &Path,
    data_path: &Path,
    label_column: Option<&str>,
) -> Result<Vec<String>, PipelineError> {
    let (pipeline, rows) = load_for_prediction(model_path, data_path, label_column)?;
    let predictions = pipeline.predict(&rows)?;
    info!(n_rows = predictions.len(), "predictions made");
    Ok(predictions)
}

/// Like [`run_prediction`], with each class's share of the tree votes.
///
/// # Errors
///
/// Same as [`run_prediction`].
#[instrument(skip_all, fields(model = %model_path.display(), data = %data_path.display()))]
pub fn run_scored_prediction(
    model_path: &Path,
    data_path: &Path,
    label_column: Option<&str>,
) -> Result<Vec<ScoredPrediction>, PipelineError> {
    let (pipeline, rows) = load_for_prediction(model_path, data_path, label_column)?;
    let predictions = pipeline.predict_scored(&rows)?;
    let mean_confidence = predictions.iter().map(|p| p.confidence).sum::<f64>()
        / predictions.len().max(1) as f64;
    info!(n_rows = predictions.len(), mean_confidence, "predictions made");
    Ok(predictions)
}

fn load_for_prediction(
    model_path: &Path,
    data_path: &Path,
    label_column: Option<&str>,
) -> Result<(Pipeline, Vec<Vec<Cell>>), PipelineError> {
    let pipeline = Pipeline::load(model_path)?;
    let mut frame = CsvLoader::new(data_path).read()?;
    if let Some(label) = label_column {
        frame = frame.without_column(label);
    }
    let rows = frame.select_columns(pipeline.preprocessing().input_names())?;
    Ok((pipeline, rows))
}

fn require_dir(path: &Path) -> Result<(), PipelineError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PipelineError::OutputDirMissing {
            path: path.to_path_buf(),
        })
    }
}

fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

fn verify_round_trip(before: &[String], after: &[String]) -> Result<(), PipelineError> {
    let mismatched: Vec<usize> = before
        .iter()
        .zip(after)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect();
    match mismatched.first() {
        None if before.len() == after.len() => Ok(()),
        first => Err(PipelineError::RoundTripMismatch {
            n_rows: before.len(),
            n_mismatched: mismatched.len().max(before.len().abs_diff(after.len())),
            first_row: first.copied().unwrap_or(before.len().min(after.len())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_trip_check_reports_first_difference() {
        let a = labels(&["x", "y", "z"]);
        assert!(verify_round_trip(&a, &a).is_ok());
        let b = labels(&["x", "q", "r"]);
        assert!(matches!(
            verify_round_trip(&a, &b),
            Err(PipelineError::RoundTripMismatch { n_rows: 3, n_mismatched: 2, first_row: 1 })
        ));
        assert!(matches!(
            verify_round_trip(&a, &a[..2]),
            Err(PipelineError::RoundTripMismatch { first_row: 2, .. })
        ));
    }

    #[test]
    fn missing_results_dir_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = TrainConfig::new()
            .with_results_dir(dir.path().join("Results"))
            .with_model_path(dir.path().join("pipeline.rxf"));
        assert!(matches!(
            run_training(&config),
            Err(PipelineError::OutputDirMissing { .. })
        ));
    }

    #[test]
    fn select_keeps_index_order() {
        let items = vec![Cell::Number(0.0), Cell::Number(1.0), Cell::Number(2.0)];
        assert_eq!(select(&items, &[2, 0]), vec![Cell::Number(2.0), Cell::Number(0.0)]);
    }
}
