//! Accuracy regression tests for rxforest-rf.
//!
//! These tests guard against algorithmic changes that degrade forest
//! accuracy on a deterministic rule-generated dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rxforest_rf::{ConfusionMatrix, MaxFeatures, RandomForestConfig, SplitCriterion};

// ---------------------------------------------------------------------------
// Helper: deterministic rule-based dataset
// ---------------------------------------------------------------------------

/// Generate `n` samples with 4 features and 4 classes.
///
/// The class is a deterministic function of features 0 and 1; features 2
/// and 3 are noise.
fn make_rule_data(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let a: f64 = rng.gen_range(0.0..10.0);
        let b: f64 = rng.gen_range(0.0..10.0);
        let label = match (a > 5.0, b > 5.0) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        };
        features.push(vec![a, b, rng.r#gen::<f64>(), rng.r#gen::<f64>()]);
        labels.push(label);
    }
    let names = (0..4).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

fn held_out_accuracy(config: &RandomForestConfig) -> f64 {
    let (train_x, train_y, names) = make_rule_data(300, 1);
    let (test_x, test_y, _) = make_rule_data(100, 2);
    let forest = config.fit(&train_x, &train_y, 4, &names).unwrap().into_forest();
    let predicted = forest.predict_batch(&test_x).unwrap();
    ConfusionMatrix::from_labels(&test_y, &predicted, 4).unwrap().accuracy()
}

// ---------------------------------------------------------------------------
// a) default forest generalizes
// ---------------------------------------------------------------------------

#[test]
fn default_forest_accuracy_above_threshold() {
    let config = RandomForestConfig::new(100).unwrap().with_seed(125);
    let accuracy = held_out_accuracy(&config);
    assert!(accuracy > 0.9, "held-out accuracy {accuracy} <= 0.9");
}

// ---------------------------------------------------------------------------
// b) entropy criterion is competitive
// ---------------------------------------------------------------------------

#[test]
fn entropy_forest_accuracy_above_threshold() {
    let config = RandomForestConfig::new(100)
        .unwrap()
        .with_criterion(SplitCriterion::Entropy)
        .with_max_features(MaxFeatures::All)
        .with_seed(125);
    let accuracy = held_out_accuracy(&config);
    assert!(accuracy > 0.9, "entropy accuracy {accuracy} <= 0.9");
}

// ---------------------------------------------------------------------------
// c) informative features dominate importances
// ---------------------------------------------------------------------------

#[test]
fn informative_features_ranked_first() {
    let (features, labels, names) = make_rule_data(300, 1);
    let result = RandomForestConfig::new(50)
        .unwrap()
        .with_seed(125)
        .fit(&features, &labels, 4, &names)
        .unwrap();
    let top_two: Vec<&str> = result.importances()[..2].iter().map(|f| f.name.as_str()).collect();
    assert!(top_two.contains(&"f0") && top_two.contains(&"f1"), "top features: {top_two:?}");
}

// ---------------------------------------------------------------------------
// d) seed reproducibility
// ---------------------------------------------------------------------------

#[test]
fn same_seed_same_predictions() {
    let (features, labels, names) = make_rule_data(150, 3);
    let fit = || {
        RandomForestConfig::new(30)
            .unwrap()
            .with_seed(125)
            .fit(&features, &labels, 4, &names)
            .unwrap()
            .into_forest()
    };
    assert_eq!(
        fit().predict_batch(&features).unwrap(),
        fit().predict_batch(&features).unwrap()
    );
}
