//! Preprocessing and random forest fitted as one unit.

use rxforest_prep::{Cell, ColumnTransformer, ColumnTransformerConfig, LabelEncoder, PrepError};
use rxforest_rf::{ClassDistribution, RandomForest, RandomForestConfig, RankedFeature, RfError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::PipelineError;

/// A class name with the forest's probability for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPrediction {
    pub label: String,
    pub confidence: f64,
}

/// How to build a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    transformer: ColumnTransformerConfig,
    forest: RandomForestConfig,
}

impl PipelineConfig {
    pub fn new(transformer: ColumnTransformerConfig, forest: RandomForestConfig) -> Self {
        Self {
            transformer,
            forest,
        }
    }

    #[must_use]
    pub fn transformer(&self) -> &ColumnTransformerConfig {
        &self.transformer
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForestConfig {
        &self.forest
    }
}

/// Column transformer, class labels, and forest, fitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    preprocessing: ColumnTransformer,
    labels: LabelEncoder,
    model: RandomForest,
    importances: Vec<RankedFeature>,
}

impl Pipeline {
    /// Fit the preprocessing on `rows`, then the forest on the transformed rows.
    ///
    /// `column_names` names the columns of `rows`; `labels[i]` is the class
    /// of `rows[i]`.
    ///
    /// # Errors
    ///
    /// Any [`PrepError`] from fitting or applying the transformer, and any
    /// [`RfError`] from training (including non-finite features
    /// produced by missing numeric cells).
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub fn fit(
        rows: &[Vec<Cell>],
        column_names: &[String],
        labels: &[String],
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let preprocessing = config.transformer.fit(rows, column_names)?;
        let features = preprocessing.transform(rows)?;
        let label_encoder = LabelEncoder::fit(labels)?;
        let targets = label_encoder.encode_all(labels)?;

        let result = config.forest.fit(
            &features,
            &targets,
            label_encoder.n_classes(),
            &preprocessing.output_names(),
        )?;
        let metadata = result.metadata().clone();
        let (model, importances) = result.into_parts();

        info!(
            n_samples = metadata.n_samples,
            n_features = metadata.n_features,
            n_classes = metadata.n_classes,
            n_trees = metadata.n_trees,
            max_features = metadata.max_features_resolved,
            "pipeline fitted"
        );

        Ok(Self {
            preprocessing,
            labels: label_encoder,
            model,
            importances,
        })
    }

    /// Predicted class name for each row.
    ///
    /// # Errors
    ///
    /// Propagates transformer and forest errors.
    pub fn predict(&self, rows: &[Vec<Cell>]) -> Result<Vec<String>, PipelineError> {
        let features = self.preprocessing.transform(rows)?;
        check_finite(&features)?;
        self.model
            .predict_batch(&features)?
            .into_iter()
            .enumerate()
            .map(|(sample_index, label)| self.class_name(label, sample_index))
            .collect()
    }

    /// Averaged class distribution for each row, in [`Pipeline::classes`] order.
    ///
    /// # Errors
    ///
    /// Propagates transformer and forest errors.
    pub fn predict_proba(&self, rows: &[Vec<Cell>]) -> Result<Vec<ClassDistribution>, PipelineError> {
        let features = self.preprocessing.transform(rows)?;
        check_finite(&features)?;
        Ok(self.model.predict_proba_batch(&features)?)
    }

    /// Predicted class name for each row with the share of tree votes behind it.
    ///
    /// Agrees with [`Pipeline::predict`] row for row.
    ///
    /// # Errors
    ///
    /// Propagates transformer and forest errors.
    pub fn predict_scored(&self, rows: &[Vec<Cell>]) -> Result<Vec<ScoredPrediction>, PipelineError> {
        self.predict_proba(rows)?
            .iter()
            .enumerate()
            .map(|(sample_index, dist)| {
                Ok(ScoredPrediction {
                    label: self.class_name(dist.predicted_class(), sample_index)?,
                    confidence: dist.confidence(),
                })
            })
            .collect()
    }

    /// Known classes, sorted; index `i` is the forest's class `i`.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        self.labels.classes()
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.model.n_trees()
    }

    /// Mean-decrease-in-impurity importances of the transformed features.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    #[must_use]
    pub fn preprocessing(&self) -> &ColumnTransformer {
        &self.preprocessing
    }

    #[must_use]
    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    /// Check that the parts of a decoded pipeline fit together.
    ///
    /// # Errors
    ///
    /// Returns a description of the first broken invariant.
    pub fn check_integrity(&self) -> Result<(), String> {
        self.preprocessing.check_integrity()?;
        if !self.labels.is_well_formed() {
            return Err("class list must be non-empty, sorted and unique".to_string());
        }
        self.model.check_integrity().map_err(|e| e.to_string())?;
        if self.model.n_features() != self.preprocessing.n_outputs() {
            return Err(format!(
                "forest expects {} features, transformer produces {}",
                self.model.n_features(),
                self.preprocessing.n_outputs()
            ));
        }
        if self.model.n_classes() != self.labels.n_classes() {
            return Err(format!(
                "forest has {} classes, label list has {}",
                self.model.n_classes(),
                self.labels.n_classes()
            ));
        }
        Ok(())
    }

    fn class_name(&self, label: usize, sample_index: usize) -> Result<String, PipelineError> {
        self.labels
            .decode(label)
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::Rf(RfError::LabelOutOfRange {
                    label,
                    sample_index,
                    n_classes: self.labels.n_classes(),
                })
            })
    }
}

/// Missing numeric cells reach the forest as `NaN`; reject them up front
/// with the transformer's view of the row.
fn check_finite(features: &[Vec<f64>]) -> Result<(), PipelineError> {
    for (sample_index, values) in features.iter().enumerate() {
        if let Some(feature_index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::Rf(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["Age", "Sex", "BP", "Cholesterol", "Na_to_K"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn patient(age: f64, sex: &str, bp: &str, chol: &str, na_to_k: f64) -> Vec<Cell> {
        vec![
            Cell::Number(age),
            Cell::Text(sex.to_string()),
            Cell::Text(bp.to_string()),
            Cell::Text(chol.to_string()),
            Cell::Number(na_to_k),
        ]
    }

    fn training_set() -> (Vec<Vec<Cell>>, Vec<String>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let age = 20.0 + i as f64;
            let high_ratio = i % 2 == 0;
            let na_to_k = if high_ratio { 20.0 + i as f64 * 0.3 } else { 8.0 + i as f64 * 0.1 };
            let bp = ["HIGH", "LOW", "NORMAL"][i % 3];
            rows.push(patient(age, ["F", "M"][i % 2], bp, "HIGH", na_to_k));
            labels.push(if high_ratio { "DrugY" } else { "drugX" }.to_string());
        }
        (rows, labels)
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new(
            ColumnTransformerConfig::new(vec![1, 2, 3], vec![0, 4]),
            RandomForestConfig::new(20).unwrap().with_seed(125),
        )
    }

    #[test]
    fn fit_and_predict_on_training_rows() {
        let (rows, labels) = training_set();
        let pipeline = Pipeline::fit(&rows, &names(), &labels, &config()).unwrap();
        assert_eq!(pipeline.classes(), &["DrugY", "drugX"]);
        assert_eq!(pipeline.n_trees(), 20);
        assert_eq!(pipeline.model().n_features(), 7);
        assert_eq!(pipeline.predict(&rows).unwrap(), labels);
        assert!(pipeline.check_integrity().is_ok());
    }

    #[test]
    fn probabilities_follow_class_order() {
        let (rows, labels) = training_set();
        let pipeline = Pipeline::fit(&rows, &names(), &labels, &config()).unwrap();
        let dists = pipeline.predict_proba(&rows[..2]).unwrap();
        assert_eq!(dists[0].as_slice().len(), 2);
        assert_eq!(dists[0].predicted_class(), 0);
        assert_eq!(dists[1].predicted_class(), 1);
    }

    #[test]
    fn scored_predictions_agree_with_predict() {
        let (rows, labels) = training_set();
        let pipeline = Pipeline::fit(&rows, &names(), &labels, &config()).unwrap();
        let scored = pipeline.predict_scored(&rows).unwrap();
        let plain = pipeline.predict(&rows).unwrap();
        assert_eq!(scored.len(), plain.len());
        for (s, p) in scored.iter().zip(&plain) {
            assert_eq!(&s.label, p);
            assert!(s.confidence >= 0.5 && s.confidence <= 1.0, "{}", s.confidence);
        }
    }

    #[test]
    fn missing_numeric_rejected_at_predict() {
        let (rows, labels) = training_set();
        let pipeline = Pipeline::fit(&rows, &names(), &labels, &config()).unwrap();
        let mut row = rows[0].clone();
        row[4] = Cell::Missing;
        assert!(matches!(
            pipeline.predict(&[row]),
            Err(PipelineError::Rf(RfError::NonFiniteValue { feature_index: 6, .. }))
        ));
    }

    #[test]
    fn unknown_category_is_fatal() {
        let (rows, labels) = training_set();
        let pipeline = Pipeline::fit(&rows, &names(), &labels, &config()).unwrap();
        let row = patient(30.0, "F", "HIGH", "NORMAL", 12.0);
        assert!(matches!(
            pipeline.predict(&[row]),
            Err(PipelineError::Prep(PrepError::UnknownCategory { .. }))
        ));
    }
}
