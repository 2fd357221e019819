//! Seeded train/test splitting.

use super::{take_rows, DataFrame};
use crate::errors::{Result, SensorflowError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffles rows with a seeded RNG and splits off `test_size` of them.
///
/// The test split receives `ceil(n_rows * test_size)` rows. Both sides must
/// end up non-empty.
pub fn train_test_split(frame: &DataFrame, test_size: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SensorflowError::config(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n_rows = frame.height();
    let n_test = (n_rows as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(SensorflowError::pipeline(format!(
            "cannot split {n_rows} rows with test_size {test_size}"
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((take_rows(frame, train_idx)?, take_rows(frame, test_idx)?))
}
