//! Row shuffling and the seeded train/test split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::PrepError;
use crate::frame::Frame;

/// Disjoint train and test row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    #[must_use]
    pub fn n_test(&self) -> usize {
        self.test.len()
    }
}

/// Shuffle the frame's rows in place.
///
/// With `seed = None` the generator is seeded from OS entropy, so the order
/// differs between runs. Pass a seed for a reproducible order.
#[instrument(skip_all, fields(n_rows = frame.n_rows(), seeded = seed.is_some()))]
pub fn shuffle_rows(frame: &mut Frame, seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut order: Vec<usize> = (0..frame.n_rows()).collect();
    order.shuffle(&mut rng);
    frame.reorder(&order);
}

/// Split `n_rows` row indices into train and test sets.
///
/// `ceil(test_fraction * n_rows)` rows go to the test set. Indices are
/// permuted with a ChaCha8 generator seeded by `seed`; the first `n_test`
/// permuted indices form the test set and the remainder the train set.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PrepError::EmptyInput`] | `n_rows == 0` |
/// | [`PrepError::InvalidTestFraction`] | `test_fraction` not in `(0, 1)` |
/// | [`PrepError::SplitTooSmall`] | Either side of the split would be empty |
#[instrument(skip_all, fields(n_rows = n_rows, test_fraction = test_fraction, seed = seed))]
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, PrepError> {
    if n_rows == 0 {
        return Err(PrepError::EmptyInput);
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PrepError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }

    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    let n_train = n_rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PrepError::SplitTooSmall {
            n_rows,
            n_train,
            n_test,
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut permutation: Vec<usize> = (0..n_rows).collect();
    permutation.shuffle(&mut rng);
    let train = permutation.split_off(n_test);

    debug!(n_train, n_test, "split rows");
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}
