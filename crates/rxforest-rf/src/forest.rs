//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig, to_columns, validate_dataset};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

impl RandomForest {
    /// Check that a forest obtained from outside (e.g. deserialized) is usable.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::CorruptModel`] describing the first broken invariant.
    pub fn check_integrity(&self) -> Result<(), RfError> {
        let corrupt = |reason: String| RfError::CorruptModel { reason };
        if self.trees.is_empty() {
            return Err(corrupt("forest has no trees".to_string()));
        }
        if self.n_features == 0 || self.n_classes == 0 {
            return Err(corrupt(format!(
                "forest declares {} features and {} classes",
                self.n_features, self.n_classes
            )));
        }
        if self.feature_names.len() != self.n_features {
            return Err(corrupt(format!(
                "{} feature names for {} features",
                self.feature_names.len(),
                self.n_features
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features != self.n_features || tree.n_classes != self.n_classes {
                return Err(corrupt(format!("tree {i} disagrees with forest dimensions")));
            }
            tree.check_integrity()
                .map_err(|reason| corrupt(format!("tree {i}: {reason}")))?;
        }
        Ok(())
    }
}

/// Draw `n_samples` indices with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_dataset(features, labels, n_classes)?;
    let n_samples = features.len();
    let max_features = config.max_features.resolve(n_features)?;

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features));
    tree_config.validate(n_features)?;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features,
        "training random forest"
    );

    // Seeds are drawn up front so the result does not depend on thread scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let columns = to_columns(features, n_features);

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let samples = bootstrap_sample(n_samples, &mut rng);
            tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit_columns(&columns, labels, n_classes, &samples)
        })
        .collect();

    debug!(
        total_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>(),
        "tree training complete"
    );

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved: max_features,
    };

    Ok(RandomForestResult::new(forest, importances, metadata))
}
