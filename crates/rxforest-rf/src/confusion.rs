//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::RfError;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    pub class: usize,
    /// TP / (TP + FP); 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 when the class never occurs.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
    /// Number of samples predicted as this class.
    pub predicted: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::LabelCountMismatch`] | `true_labels` and `predicted` differ in length |
    /// | [`RfError::LabelOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [t, p].into_iter().find(|&l| l >= n_classes) {
                return Err(RfError::LabelOutOfRange {
                    label,
                    sample_index,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let row_sums = self.row_sums();
        let column_sums = self.column_sums();
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let support = row_sums[c];
                let predicted = column_sums[c];
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                    predicted,
                }
            })
            .collect()
    }

    /// Unweighted mean F1 over the classes that were observed.
    ///
    /// A class counts as observed when it occurs among the true labels or
    /// among the predictions. Classes that never appear in either are
    /// skipped rather than contributing an F1 of zero.
    #[must_use]
    pub fn macro_f1(&self) -> f64 {
        let observed: Vec<f64> = self
            .class_metrics()
            .into_iter()
            .filter(|m| m.support > 0 || m.predicted > 0)
            .map(|m| m.f1)
            .collect();
        if observed.is_empty() {
            0.0
        } else {
            observed.iter().sum::<f64>() / observed.len() as f64
        }
    }

    /// Number of true samples per class.
    #[must_use]
    pub fn row_sums(&self) -> Vec<usize> {
        self.matrix.iter().map(|row| row.iter().sum()).collect()
    }

    /// Number of predictions per class.
    #[must_use]
    pub fn column_sums(&self) -> Vec<usize> {
        (0..self.n_classes)
            .map(|c| self.matrix.iter().map(|row| row[c]).sum())
            .collect()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;
        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>7}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_labels(&labels, &labels, 3).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!((cm.macro_f1() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn known_confusion_matrix() {
        let true_labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();

        // Every class: TP=2, FP=1, FN=1.
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
        assert!((cm.macro_f1() - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn macro_f1_skips_unobserved_classes() {
        // Class 2 is neither true nor predicted; average runs over classes 0 and 1.
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1], &[0, 1, 1, 1], 3).unwrap();
        let f1_0 = 2.0 * 1.0 * 0.5 / 1.5;
        let f1_1 = 2.0 * (2.0 / 3.0) * 1.0 / (2.0 / 3.0 + 1.0);
        assert!((cm.macro_f1() - (f1_0 + f1_1) / 2.0).abs() < 1e-10);
    }

    #[test]
    fn predicted_only_class_counts_toward_macro_f1() {
        // Class 1 never occurs but is predicted once: F1 = 0 is averaged in.
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[0, 1], 2).unwrap();
        let f1_0 = 2.0 * 1.0 * 0.5 / 1.5;
        assert!((cm.macro_f1() - f1_0 / 2.0).abs() < 1e-10);
    }

    #[test]
    fn row_sums_are_class_supports() {
        let true_labels = vec![0, 1, 1, 2, 2, 2];
        let predicted = vec![2, 1, 0, 2, 2, 1];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();
        assert_eq!(cm.row_sums(), vec![1, 2, 3]);
        assert_eq!(cm.column_sums(), vec![1, 2, 3]);
        assert_eq!(cm.total(), 6);
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 3),
            Err(RfError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0], 2),
            Err(RfError::LabelCountMismatch { .. })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0, 5], 2),
            Err(RfError::LabelOutOfRange { label: 5, sample_index: 1, .. })
        ));
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }
}
