//! Test-set scoring on class names.

use std::collections::BTreeSet;

use rxforest_rf::{ConfusionMatrix, RfError};
use tracing::{debug, instrument};

use crate::PipelineError;

/// Accuracy, macro-F1, and a confusion matrix for one set of predictions.
#[derive(Debug, Clone)]
pub struct Evaluation {
    accuracy: f64,
    macro_f1: f64,
    classes: Vec<String>,
    confusion: ConfusionMatrix,
}

impl Evaluation {
    /// Score `y_pred` against `y_true`.
    ///
    /// Macro-F1 averages over every label that occurs in either slice.
    /// The confusion matrix is indexed by `classes`; pairs involving a
    /// label outside `classes` are left out of it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | No labels, or no pair within `classes` |
    /// | [`RfError::LabelCountMismatch`] | `y_true` and `y_pred` differ in length |
    #[instrument(skip_all, fields(n_samples = y_true.len(), n_classes = classes.len()))]
    pub fn compute(
        y_true: &[String],
        y_pred: &[String],
        classes: &[String],
    ) -> Result<Self, PipelineError> {
        if y_true.len() != y_pred.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: y_true.len(),
                n_labels: y_pred.len(),
            }
            .into());
        }

        let observed: Vec<&String> = y_true
            .iter()
            .chain(y_pred)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index_in = |labels: &[&String], label: &String| {
            labels.binary_search(&label).ok()
        };
        let encode_observed = |ys: &[String]| -> Vec<usize> {
            ys.iter()
                .filter_map(|y| index_in(&observed, y))
                .collect()
        };
        let scored = ConfusionMatrix::from_labels(
            &encode_observed(y_true),
            &encode_observed(y_pred),
            observed.len(),
        )?;

        let class_index = |label: &String| classes.iter().position(|c| c == label);
        let (known_true, known_pred): (Vec<usize>, Vec<usize>) = y_true
            .iter()
            .zip(y_pred)
            .filter_map(|(t, p)| Some((class_index(t)?, class_index(p)?)))
            .unzip();
        let confusion = ConfusionMatrix::from_labels(&known_true, &known_pred, classes.len())?;

        let evaluation = Self {
            accuracy: scored.accuracy(),
            macro_f1: scored.macro_f1(),
            classes: classes.to_vec(),
            confusion,
        };
        debug!(
            accuracy = evaluation.accuracy,
            macro_f1 = evaluation.macro_f1,
            left_out = y_true.len() - known_true.len(),
            "evaluation computed"
        );
        Ok(evaluation)
    }

    /// Fraction of exact matches, in `[0, 1]`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Unweighted mean of per-label F1, in `[0, 1]`.
    #[must_use]
    pub fn macro_f1(&self) -> f64 {
        self.macro_f1
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Counts with rows as true and columns as predicted class, in [`Evaluation::classes`] order.
    #[must_use]
    pub fn confusion(&self) -> &ConfusionMatrix {
        &self.confusion
    }
}
