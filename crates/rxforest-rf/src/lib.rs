//! Random Forest classification: train, predict, evaluate.
//!
//! A hand-rolled Random Forest classifier built from CART decision trees
//! with Gini/Entropy split criteria, bootstrap sampling, random feature
//! subsampling, parallel training via rayon, MDI feature importances, and
//! a confusion matrix with accuracy / per-class / macro-F1 metrics.

mod config;
mod confusion;
mod error;
mod forest;
mod importance;
mod node;
mod predict;
mod result;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
