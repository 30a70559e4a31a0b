//! Train/test splitting of bar series.

use quant_batch_core::SplitMode;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Rows assigned to the test set: `ceil(len * fraction)`, at most `len`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn test_len(len: usize, fraction: f64) -> usize {
    let fraction = fraction.clamp(0.0, 1.0);
    ((len as f64 * fraction).ceil() as usize).min(len)
}

/// Splits `rows` into train and test sets.
///
/// `Chronological` keeps the first rows for training. `Shuffled` assigns
/// rows at random with a seeded generator; both halves keep their
/// original order so indicator series stay contiguous in time.
#[must_use]
pub fn train_test_split<T: Clone>(
    rows: &[T],
    test_fraction: f64,
    mode: SplitMode,
    seed: u64,
) -> (Vec<T>, Vec<T>) {
    let n_test = test_len(rows.len(), test_fraction);
    let n_train = rows.len() - n_test;

    match mode {
        SplitMode::Chronological => (rows[..n_train].to_vec(), rows[n_train..].to_vec()),
        SplitMode::Shuffled => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut order: Vec<usize> = (0..rows.len()).collect();
            order.shuffle(&mut rng);

            let mut test_idx = order[..n_test].to_vec();
            let mut train_idx = order[n_test..].to_vec();
            test_idx.sort_unstable();
            train_idx.sort_unstable();

            let pick = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect::<Vec<T>>();
            (pick(&train_idx), pick(&test_idx))
        }
    }
}
