use super::binning::{BinnedFeatures, BinningInstruction};
use rayon::prelude::*;

/// The aggregate gradient and hessian statistics of the examples that reach a node, for every bin of every feature. Features not sampled for the current tree have no entries.
#[derive(Clone, Debug)]
pub struct BinStats {
	pub entries: Vec<Vec<BinStatsEntry>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BinStatsEntry {
	pub sum_gradients: f64,
	pub sum_hessians: f64,
	pub count: usize,
}

impl BinStats {
	/// Accumulate the gradients and hessians of the examples in `examples_index` into the bins of each sampled feature. `feature_indexes` must be sorted.
	pub fn compute(
		binning_instructions: &[BinningInstruction],
		binned_features: &BinnedFeatures,
		feature_indexes: &[usize],
		gradients: &[f32],
		hessians: &[f32],
		examples_index: &[usize],
	) -> Self {
		let entries = binning_instructions
			.par_iter()
			.zip(binned_features.columns.par_iter())
			.enumerate()
			.map(|(feature_index, (binning_instruction, binned_values))| {
				if feature_indexes.binary_search(&feature_index).is_err() {
					return Vec::new();
				}
				let mut entries = vec![BinStatsEntry::default(); binning_instruction.n_bins()];
				for example_index in examples_index {
					let entry = &mut entries[binned_values[*example_index] as usize];
					entry.sum_gradients += f64::from(gradients[*example_index]);
					entry.sum_hessians += f64::from(hessians[*example_index]);
					entry.count += 1;
				}
				entries
			})
			.collect();
		Self { entries }
	}

	/// Turn the parent's bin stats into the bin stats of its larger child by subtracting the bin stats of the smaller child.
	pub fn subtract(&mut self, smaller: &BinStats) {
		for (entries, smaller_entries) in self.entries.iter_mut().zip(smaller.entries.iter()) {
			for (entry, smaller_entry) in entries.iter_mut().zip(smaller_entries.iter()) {
				entry.sum_gradients -= smaller_entry.sum_gradients;
				entry.sum_hessians -= smaller_entry.sum_hessians;
				entry.count -= smaller_entry.count;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_subtraction_matches_direct_computation() {
		let binning_instructions = vec![
			BinningInstruction {
				thresholds: vec![1.5],
			},
			BinningInstruction {
				thresholds: vec![],
			},
		];
		let binned_features = BinnedFeatures {
			columns: vec![vec![1, 2, 0, 2], vec![1, 1, 1, 0]],
		};
		let gradients = [0.5, -0.5, 0.25, -0.25];
		let hessians = [0.25, 0.25, 0.5, 0.5];
		let mut parent = BinStats::compute(
			&binning_instructions,
			&binned_features,
			&[0, 1],
			&gradients,
			&hessians,
			&[0, 1, 2, 3],
		);
		let smaller = BinStats::compute(
			&binning_instructions,
			&binned_features,
			&[0, 1],
			&gradients,
			&hessians,
			&[2],
		);
		let larger = BinStats::compute(
			&binning_instructions,
			&binned_features,
			&[0, 1],
			&gradients,
			&hessians,
			&[0, 1, 3],
		);
		parent.subtract(&smaller);
		assert_eq!(parent.entries, larger.entries);
	}

	#[test]
	fn test_unsampled_features_are_empty() {
		let binning_instructions = vec![
			BinningInstruction {
				thresholds: vec![],
			},
			BinningInstruction {
				thresholds: vec![],
			},
		];
		let binned_features = BinnedFeatures {
			columns: vec![vec![1, 1], vec![1, 0]],
		};
		let bin_stats = BinStats::compute(
			&binning_instructions,
			&binned_features,
			&[1],
			&[1.0, 2.0],
			&[1.0, 1.0],
			&[0, 1],
		);
		assert!(bin_stats.entries[0].is_empty());
		assert_eq!(
			bin_stats.entries[1],
			vec![
				BinStatsEntry {
					sum_gradients: 2.0,
					sum_hessians: 1.0,
					count: 1,
				},
				BinStatsEntry {
					sum_gradients: 1.0,
					sum_hessians: 1.0,
					count: 1,
				},
			]
		);
	}
}
