//! Reproducible train / evaluation split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices of each partition, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(n * test_fraction)` rows.
///
/// With at least two rows, both partitions are non-empty. The same `(n, fraction,
/// seed)` always yields the same partition.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> Partition {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let n_test = test_size(n, test_fraction);
    let mut test = idx[..n_test].to_vec();
    let mut train = idx[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();

    Partition { train, test }
}

fn test_size(n: usize, test_fraction: f64) -> usize {
    if n < 2 || !(test_fraction > 0.0) {
        return 0;
    }
    let raw = (n as f64 * test_fraction.min(1.0)).ceil() as usize;
    raw.clamp(1, n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_partition() {
        assert_eq!(split_indices(50, 0.2, 42), split_indices(50, 0.2, 42));
        assert_ne!(split_indices(50, 0.2, 42), split_indices(50, 0.2, 7));
    }

    #[test]
    fn sizes_round_up_and_cover_everything() {
        let p = split_indices(11, 0.2, 1);
        assert_eq!(p.test.len(), 3);
        assert_eq!(p.train.len(), 8);

        let mut all: Vec<usize> = p.train.iter().chain(p.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_inputs_keep_a_training_row() {
        assert_eq!(split_indices(1, 0.2, 0).test.len(), 0);
        let p = split_indices(2, 0.9, 0);
        assert_eq!((p.train.len(), p.test.len()), (1, 1));
        assert!(split_indices(10, 0.0, 0).test.is_empty());
    }
}
