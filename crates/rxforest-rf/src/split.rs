use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// An empty node is reported as pure.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let proportions = class_counts.iter().filter(|&&c| c > 0).map(|&c| c as f64 / n);
        let value = match self {
            SplitCriterion::Gini => 1.0 - proportions.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -proportions.map(|p| p * p.ln()).sum::<f64>(),
        };
        Impurity::new(value.max(0.0))
    }
}

/// Best split found for one node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n·I(parent) - n_l·I(left) - n_r·I(right)`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Per-node inputs to the split search that stay constant across a tree.
pub(crate) struct SplitContext<'a> {
    /// Column-major features: `columns[feature_idx][sample_idx]`.
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitContext<'_> {
    /// Find the best threshold split over a random subset of `max_features` columns.
    ///
    /// For each candidate column the samples are sorted by value and scanned
    /// once, moving one sample at a time from the right child to the left
    /// child. Thresholds sit halfway between consecutive distinct values.
    ///
    /// Returns `None` when no candidate column admits a split that respects
    /// `min_samples_leaf` (for example when every candidate is constant).
    pub(crate) fn find_best_split(
        &self,
        sample_indices: &[usize],
        rng: &mut impl Rng,
    ) -> Option<SplitResult> {
        let n_features = self.columns.len();
        let n_samples = sample_indices.len();
        if n_samples < 2 || n_features == 0 {
            return None;
        }

        let mut parent_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            parent_counts[self.labels[si]] += 1;
        }
        let parent_impurity = self.criterion.impurity(&parent_counts, n_samples).value();

        // Partial Fisher-Yates over the feature order.
        let take = self.max_features.min(n_features);
        let mut feature_order: Vec<usize> = (0..n_features).collect();
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }

        let mut best_decrease = f64::NEG_INFINITY;
        let mut best: Option<(usize, f64)> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

        for &feat_idx in &feature_order[..take] {
            let column = &self.columns[feat_idx];
            sorted.clear();
            sorted.extend(sample_indices.iter().map(|&si| (column[si], si)));
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.clone();

            for i in 0..n_samples - 1 {
                let (value, si) = sorted[i];
                let class = self.labels[si];
                left_counts[class] += 1;
                right_counts[class] -= 1;

                let next_value = sorted[i + 1].0;
                if value == next_value {
                    continue;
                }

                let n_left = i + 1;
                let n_right = n_samples - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let left_impurity = self.criterion.impurity(&left_counts, n_left).value();
                let right_impurity = self.criterion.impurity(&right_counts, n_right).value();
                let decrease = n_samples as f64 * parent_impurity
                    - n_left as f64 * left_impurity
                    - n_right as f64 * right_impurity;

                if decrease > best_decrease {
                    best_decrease = decrease;
                    let mut threshold = value + (next_value - value) / 2.0;
                    // Midpoint can round up to the right-hand value for adjacent floats.
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some((feat_idx, threshold));
                }
            }
        }

        let (feat_idx, threshold) = best?;
        let column = &self.columns[feat_idx];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
            .iter()
            .partition(|&&si| column[si] <= threshold);

        Some(SplitResult {
            feature: FeatureIndex::new(feat_idx),
            threshold,
            impurity_decrease: best_decrease,
            left_indices,
            right_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SplitContext, SplitCriterion};

    fn context<'a>(
        columns: &'a [Vec<f64>],
        labels: &'a [usize],
        max_features: usize,
        min_samples_leaf: usize,
    ) -> SplitContext<'a> {
        SplitContext {
            columns,
            labels,
            n_classes: 2,
            criterion: SplitCriterion::Gini,
            max_features,
            min_samples_leaf,
        }
    }

    #[test]
    fn gini_values() {
        assert!(SplitCriterion::Gini.impurity(&[10, 0, 0], 10).value().abs() < f64::EPSILON);
        assert!((SplitCriterion::Gini.impurity(&[5, 5], 10).value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn entropy_values() {
        assert!(SplitCriterion::Entropy.impurity(&[4, 0], 4).value().abs() < f64::EPSILON);
        let balanced = SplitCriterion::Entropy.impurity(&[5, 5], 10).value();
        assert!((balanced - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn separable_column_splits_between_groups() {
        let columns = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let samples: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(125);

        let split = context(&columns, &labels, 1, 1)
            .find_best_split(&samples, &mut rng)
            .expect("separable data must split");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn picks_informative_column_when_all_considered() {
        // Column 0 is noise, column 1 separates the classes.
        let columns = vec![
            vec![5.0, 1.0, 5.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
        ];
        let labels = vec![0, 0, 1, 1];
        let samples: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let split = context(&columns, &labels, 2, 1)
            .find_best_split(&samples, &mut rng)
            .unwrap();
        assert_eq!(split.feature.index(), 1);
    }

    #[test]
    fn constant_column_has_no_split() {
        let columns = vec![vec![3.0; 4]];
        let labels = vec![0, 1, 0, 1];
        let samples: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(context(&columns, &labels, 1, 1).find_best_split(&samples, &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let columns = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let samples = vec![0, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(context(&columns, &labels, 1, 2).find_best_split(&samples, &mut rng).is_none());
    }
}
