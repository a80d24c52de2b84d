//! Settings for an end-to-end training run.

use std::path::{Path, PathBuf};

use rxforest_prep::{ColumnTransformerConfig, UnknownCategoryPolicy};
use rxforest_rf::{MaxFeatures, RandomForestConfig, RfError, SplitCriterion};

use crate::pipeline::PipelineConfig;

/// File name of the metrics report inside the results directory.
pub const METRICS_FILE: &str = "metrics.txt";
/// File name of the confusion-matrix image inside the results directory.
pub const CONFUSION_IMAGE_FILE: &str = "model_results.png";

/// Configuration for [`crate::run_training`].
///
/// Construct via [`TrainConfig::new`], then chain `with_*` methods. Column
/// indices refer to the feature columns left after removing the label.
///
/// # Defaults
///
/// | Parameter             | Default                    |
/// |-----------------------|----------------------------|
/// | `data_path`           | `Data/drug200.csv`         |
/// | `results_dir`         | `Results`                  |
/// | `model_path`          | `Model/drug_pipeline.rxf`  |
/// | `label_column`        | `Drug`                     |
/// | `categorical_columns` | `[1, 2, 3]`                |
/// | `numeric_columns`     | `[0, 4]`                   |
/// | `test_fraction`       | 0.3                        |
/// | `split_seed`          | 125                        |
/// | `shuffle_seed`        | `None` (OS entropy)        |
/// | `n_trees`             | 100                        |
/// | `forest_seed`         | 125                        |
/// | `criterion`           | `Gini`                     |
/// | `max_features`        | `Sqrt`                     |
/// | `dpi`                 | 120                        |
/// | `unknown_policy`      | `Error`                    |
///
/// The artifact is this crate's own bincode container, not a skops archive,
/// so `model_path` carries the `.rxf` extension where a scikit-learn setup
/// would write `Model/drug_pipeline.skops`.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub(crate) data_path: PathBuf,
    pub(crate) results_dir: PathBuf,
    pub(crate) model_path: PathBuf,
    pub(crate) label_column: String,
    pub(crate) categorical_columns: Vec<usize>,
    pub(crate) numeric_columns: Vec<usize>,
    pub(crate) test_fraction: f64,
    pub(crate) split_seed: u64,
    pub(crate) shuffle_seed: Option<u64>,
    pub(crate) n_trees: usize,
    pub(crate) forest_seed: u64,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: MaxFeatures,
    pub(crate) dpi: u32,
    pub(crate) unknown_policy: UnknownCategoryPolicy,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_path: PathBuf::from("Data/drug200.csv"),
            results_dir: PathBuf::from("Results"),
            model_path: PathBuf::from("Model/drug_pipeline.rxf"),
            label_column: "Drug".to_string(),
            categorical_columns: vec![1, 2, 3],
            numeric_columns: vec![0, 4],
            test_fraction: 0.3,
            split_seed: 125,
            shuffle_seed: None,
            n_trees: 100,
            forest_seed: 125,
            criterion: SplitCriterion::Gini,
            max_features: MaxFeatures::Sqrt,
            dpi: 120,
            unknown_policy: UnknownCategoryPolicy::Error,
        }
    }

    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    #[must_use]
    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    #[must_use]
    pub fn with_columns(mut self, categorical: Vec<usize>, numeric: Vec<usize>) -> Self {
        self.categorical_columns = categorical;
        self.numeric_columns = numeric;
        self
    }

    #[must_use]
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self
    }

    /// `None` shuffles from OS entropy, so row order differs between runs.
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }

    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    #[must_use]
    pub fn with_forest_seed(mut self, seed: u64) -> Self {
        self.forest_seed = seed;
        self
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Features considered at each split; resolved against the transformed width.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    #[must_use]
    pub fn with_unknown_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.results_dir.join(METRICS_FILE)
    }

    pub fn confusion_image_path(&self) -> PathBuf {
        self.results_dir.join(CONFUSION_IMAGE_FILE)
    }

    /// Build the preprocessing and forest configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, RfError> {
        let transformer = ColumnTransformerConfig::new(
            self.categorical_columns.clone(),
            self.numeric_columns.clone(),
        )
        .with_unknown_policy(self.unknown_policy);
        let forest = RandomForestConfig::new(self.n_trees)?
            .with_seed(self.forest_seed)
            .with_criterion(self.criterion)
            .with_max_features(self.max_features);
        Ok(PipelineConfig::new(transformer, forest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_table() {
        let config = TrainConfig::new();
        assert_eq!(config.data_path(), Path::new("Data/drug200.csv"));
        assert_eq!(config.metrics_path(), Path::new("Results/metrics.txt"));
        assert_eq!(config.confusion_image_path(), Path::new("Results/model_results.png"));
        assert_eq!(config.model_path(), Path::new("Model/drug_pipeline.rxf"));
        assert_eq!(config.label_column(), "Drug");
        assert_eq!(config.split_seed, 125);
        assert_eq!(config.forest_seed, 125);
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.shuffle_seed, None);
        assert_eq!(config.dpi, 120);
        assert_eq!(config.criterion, SplitCriterion::Gini);
        assert_eq!(config.max_features, MaxFeatures::Sqrt);
    }

    #[test]
    fn forest_settings_reach_pipeline_config() {
        let built = TrainConfig::new()
            .with_criterion(SplitCriterion::Entropy)
            .with_max_features(MaxFeatures::Log2)
            .pipeline_config()
            .unwrap();
        assert_eq!(built.forest().criterion(), SplitCriterion::Entropy);
        assert_eq!(built.forest().max_features(), MaxFeatures::Log2);
    }

    #[test]
    fn zero_trees_rejected_when_building() {
        let err = TrainConfig::new().with_n_trees(0).pipeline_config().unwrap_err();
        assert!(matches!(err, RfError::InvalidTreeCount { n_trees: 0 }));
    }
}
