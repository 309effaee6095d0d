use anyhow::{bail, Result};
use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// The row indexes of each side of a train/test split.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainTestSplit {
	pub train: Vec<usize>,
	pub test: Vec<usize>,
}

/// Shuffle the indexes `0..n` with a generator seeded from `seed`, then take the first `ceil(test_size * n)` for the test set and the rest for the train set. The same `n`, `test_size` and `seed` always produce the same split.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
	if !(test_size > 0.0 && test_size < 1.0) {
		bail!("test_size must be between 0 and 1, but it is {}", test_size);
	}
	let mut indexes: Vec<usize> = (0..n).collect();
	let mut rng = Xoshiro256Plus::seed_from_u64(seed);
	indexes.shuffle(&mut rng);
	let n_test = ((test_size * n as f64).ceil() as usize).min(n);
	let train = indexes.split_off(n_test);
	Ok(TrainTestSplit {
		train,
		test: indexes,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeSet;

	#[test]
	fn test_sizes() {
		let split = train_test_split(5, 0.4, 42).unwrap();
		assert_eq!(split.train.len(), 3);
		assert_eq!(split.test.len(), 2);
		let split = train_test_split(10, 0.25, 42).unwrap();
		assert_eq!(split.train.len(), 7);
		assert_eq!(split.test.len(), 3);
	}

	#[test]
	fn test_disjoint_and_complete() {
		let split = train_test_split(100, 0.2, 7).unwrap();
		let train: BTreeSet<usize> = split.train.iter().copied().collect();
		let test: BTreeSet<usize> = split.test.iter().copied().collect();
		assert!(train.is_disjoint(&test));
		assert_eq!(train.len() + test.len(), 100);
		assert_eq!(train.union(&test).count(), 100);
	}

	#[test]
	fn test_seeded() {
		assert_eq!(
			train_test_split(50, 0.2, 42).unwrap(),
			train_test_split(50, 0.2, 42).unwrap()
		);
		assert_ne!(
			train_test_split(50, 0.2, 42).unwrap(),
			train_test_split(50, 0.2, 43).unwrap()
		);
	}

	#[test]
	fn test_rejects_invalid_test_size() {
		assert!(train_test_split(10, 0.0, 0).is_err());
		assert!(train_test_split(10, 1.0, 0).is_err());
		assert!(train_test_split(10, f64::NAN, 0).is_err());
	}
}
