use std::fmt;

/// Zero-based column index into the transformed feature matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Position of a node inside a tree's `Vec<Node>` arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node impurity under the configured criterion (Gini or Entropy).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`], so a whole tree is a flat
/// `Vec<Node>` that serializes without any pointer fix-up.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node: samples with `x[feature] <= threshold` go left.
    Split {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: Impurity,
        n_samples: usize,
        /// Weighted impurity decrease produced by this split (MDI numerator).
        impurity_decrease: f64,
    },
    /// Terminal node holding the class frequencies of its training samples.
    Leaf {
        /// Normalized class distribution, one entry per class.
        distribution: Vec<f64>,
        impurity: Impurity,
        n_samples: usize,
    },
}

impl Node {
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Index of the largest entry, preferring the lowest index on ties.
pub(crate) fn first_argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_index_display() {
        assert_eq!(format!("{}", FeatureIndex::new(3)), "f3");
    }

    #[test]
    fn leaf_and_split_accessors() {
        let leaf = Node::Leaf {
            distribution: vec![0.25, 0.75],
            impurity: Impurity::new(0.375),
            n_samples: 8,
        };
        let split = Node::Split {
            feature: FeatureIndex::new(1),
            threshold: 0.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.5),
            n_samples: 16,
            impurity_decrease: 2.0,
        };
        assert!(leaf.is_leaf());
        assert!(!split.is_leaf());
        assert_eq!(leaf.n_samples(), 8);
        assert!((split.impurity().value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn argmax_prefers_first_on_tie() {
        assert_eq!(first_argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(first_argmax(&[0.1, 0.3, 0.6]), 2);
    }

    #[test]
    fn zero_impurity_is_pure() {
        assert!(Impurity::new(0.0).is_pure());
        assert!(!Impurity::new(0.1).is_pure());
    }
}
