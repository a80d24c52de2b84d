use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Node, NodeIndex, first_argmax},
    split::{SplitContext, SplitCriterion},
};

/// Configuration for a single CART decision tree.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 0                     |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 0,
        }
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Limit depth to `d` levels below the root. `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Number of randomly chosen features examined per split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a decision tree on a row-major dataset.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                              |
    /// |-------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                               |
    /// | [`RfError::ZeroFeatures`]           | rows have zero feature columns                    |
    /// | [`RfError::LabelCountMismatch`]     | `labels.len() != features.len()`                  |
    /// | [`RfError::LabelOutOfRange`]        | a label is `>= n_classes`                         |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths                    |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite                      |
    /// | [`RfError::InvalidMaxFeatures`]     | `max_features` is outside [1, n_features]         |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                           |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                            |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<DecisionTree, RfError> {
        let n_features = validate_dataset(features, labels, n_classes)?;
        self.validate(n_features)?;
        let columns = to_columns(features, n_features);
        let samples: Vec<usize> = (0..features.len()).collect();
        Ok(self.fit_columns(&columns, labels, n_classes, &samples))
    }

    pub(crate) fn validate(&self, n_features: usize) -> Result<(), RfError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(())
    }

    /// Grow a tree over pre-validated column-major data.
    ///
    /// `samples` may contain repeated indices (bootstrap draws); each
    /// occurrence counts as one training sample.
    #[instrument(skip_all, fields(n_samples = samples.len()))]
    pub(crate) fn fit_columns(
        &self,
        columns: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        samples: &[usize],
    ) -> DecisionTree {
        let n_features = columns.len();
        let ctx = SplitContext {
            columns,
            labels,
            n_classes,
            criterion: self.criterion,
            max_features: self.max_features.unwrap_or(n_features),
            min_samples_leaf: self.min_samples_leaf,
        };
        let mut builder = TreeBuilder {
            ctx,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.grow(samples, 0);

        debug!(n_nodes = builder.arena.len(), "decision tree built");

        DecisionTree {
            nodes: builder.arena,
            n_features,
            n_classes,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a row-major dataset and return its feature count.
pub(crate) fn validate_dataset(
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, (row, &label)) in features.iter().zip(labels).enumerate() {
        if label >= n_classes {
            return Err(RfError::LabelOutOfRange {
                label,
                sample_index,
                n_classes,
            });
        }
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Transpose row-major features into one `Vec` per column.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|f| features.iter().map(|row| row[f]).collect())
        .collect()
}

struct TreeBuilder<'a> {
    ctx: SplitContext<'a>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `samples` and return its arena index.
    fn grow(&mut self, samples: &[usize], depth: usize) -> NodeIndex {
        let n_samples = samples.len();
        let mut class_counts = vec![0usize; self.ctx.n_classes];
        for &si in samples {
            class_counts[self.ctx.labels[si]] += 1;
        }
        let impurity = self.ctx.criterion.impurity(&class_counts, n_samples);

        let at_max_depth = self.max_depth.is_some_and(|d| depth >= d);
        let split = if at_max_depth || impurity.is_pure() || n_samples < self.min_samples_split {
            None
        } else {
            self.ctx.find_best_split(samples, &mut self.rng)
        };

        let Some(split) = split else {
            let total = n_samples as f64;
            let idx = self.arena.len();
            self.arena.push(Node::Leaf {
                distribution: class_counts.iter().map(|&c| c as f64 / total).collect(),
                impurity,
                n_samples,
            });
            return NodeIndex::new(idx);
        };

        // Reserve the slot so children get higher indices, then fill it in.
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            distribution: Vec::new(),
            impurity,
            n_samples,
        });
        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);
        self.arena[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };
        NodeIndex::new(idx)
    }
}

/// A fitted CART decision tree stored as a flat node arena rooted at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class index for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(first_argmax(self.predict_proba(sample)?))
    }

    /// Return the leaf class distribution reached by `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution, .. } => return Ok(distribution),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Mean Decrease in Impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match self.nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
                Some(Node::Leaf { .. }) => max_depth = max_depth.max(d),
                None => {}
            }
        }
        max_depth
    }

    /// Verify that the arena is a well-formed tree for `n_features` x `n_classes`.
    ///
    /// Children must point strictly forward (which also rules out cycles),
    /// split features must be in range, thresholds finite, and every leaf
    /// must carry an `n_classes`-long distribution.
    pub(crate) fn check_integrity(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= self.n_features {
                        return Err(format!("node {idx} splits on {feature} of {}", self.n_features));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child.index() <= idx || child.index() >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {}", child.index()));
                        }
                    }
                }
                Node::Leaf { distribution, .. } => {
                    if distribution.len() != self.n_classes {
                        return Err(format!(
                            "leaf {idx} has {} class probabilities, expected {}",
                            distribution.len(),
                            self.n_classes
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 0, 0], 1).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn separates_two_groups() {
        let (features, labels) = two_groups();
        let tree = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn xor_needs_two_levels_and_depth_limit_applies() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let labels = vec![0, 1, 1, 0];
        let full = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();
        assert!(full.depth() >= 2);

        let stump = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, &labels, 2)
            .unwrap();
        assert!(stump.depth() <= 1);
    }

    #[test]
    fn unseen_class_keeps_distribution_slot() {
        let (features, labels) = two_groups();
        let tree = DecisionTreeConfig::new().fit(&features, &labels, 3).unwrap();
        let proba = tree.predict_proba(&[1.0, 0.0]).unwrap();
        assert_eq!(proba.len(), 3);
        assert!(proba[2].abs() < f64::EPSILON);
    }

    #[test]
    fn importances_credit_informative_feature() {
        let (features, labels) = two_groups();
        let tree = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();
        let importances = tree.feature_importances();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert!(importances[1].abs() < 1e-12);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let cfg = DecisionTreeConfig::new();
        assert!(matches!(cfg.fit(&[], &[], 2), Err(RfError::EmptyDataset)));
        assert!(matches!(
            cfg.fit(&[vec![1.0, 2.0], vec![3.0]], &[0, 1], 2),
            Err(RfError::FeatureCountMismatch { sample_index: 1, .. })
        ));
        assert!(matches!(
            cfg.fit(&[vec![1.0, f64::NAN]], &[0], 2),
            Err(RfError::NonFiniteValue { sample_index: 0, feature_index: 1 })
        ));
        assert!(matches!(
            cfg.fit(&[vec![1.0]], &[4], 2),
            Err(RfError::LabelOutOfRange { label: 4, .. })
        ));
        assert!(matches!(
            cfg.clone().with_max_depth(Some(0)).fit(&[vec![1.0]], &[0], 1),
            Err(RfError::InvalidMaxDepth { .. })
        ));
    }

    #[test]
    fn prediction_width_checked() {
        let (features, labels) = two_groups();
        let tree = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();
        assert!(matches!(
            tree.predict(&[1.0]),
            Err(RfError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn integrity_check_catches_backward_child() {
        let (features, labels) = two_groups();
        let mut tree = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();
        assert!(tree.check_integrity().is_ok());
        if let Node::Split { left, .. } = &mut tree.nodes[0] {
            *left = NodeIndex::new(0);
        }
        assert!(tree.check_integrity().is_err());
    }
}
