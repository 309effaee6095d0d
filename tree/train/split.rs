use super::{bin_stats::BinStats, binning::BinningInstruction, tree::TrainBranchSplit};
use crate::{SplitDirection, TrainOptions};

pub struct ChooseBestSplitOutput {
	pub gain: f32,
	pub split: TrainBranchSplit,
	pub left_n_examples: usize,
	pub left_sum_gradients: f64,
	pub left_sum_hessians: f64,
	pub right_n_examples: usize,
	pub right_sum_gradients: f64,
	pub right_sum_hessians: f64,
}

/// Find the split with the highest gain across the sampled features, if a valid one exists. When two features tie, the one with the lower index wins.
#[allow(clippy::too_many_arguments)]
pub fn choose_best_split(
	binning_instructions: &[BinningInstruction],
	bin_stats: &BinStats,
	feature_indexes: &[usize],
	n_examples: usize,
	sum_gradients: f64,
	sum_hessians: f64,
	options: &TrainOptions,
) -> Option<ChooseBestSplitOutput> {
	feature_indexes
		.iter()
		.filter_map(|feature_index| {
			choose_best_split_for_feature(
				*feature_index,
				&binning_instructions[*feature_index],
				bin_stats,
				n_examples,
				sum_gradients,
				sum_hessians,
				options,
			)
		})
		.fold(None, |best: Option<ChooseBestSplitOutput>, candidate| match best {
			Some(best) if best.gain >= candidate.gain => Some(best),
			_ => Some(candidate),
		})
}

/// Scan the bins of a feature from left to right. A split at bin `k` sends the valid bins `1..=k` left. Invalid values go left whenever the node has any. Otherwise they go to the side with more examples.
fn choose_best_split_for_feature(
	feature_index: usize,
	binning_instruction: &BinningInstruction,
	bin_stats: &BinStats,
	n_examples: usize,
	sum_gradients: f64,
	sum_hessians: f64,
	options: &TrainOptions,
) -> Option<ChooseBestSplitOutput> {
	let entries = &bin_stats.entries[feature_index];
	let invalid = entries.first()?;
	let l2_regularization = f64::from(options.l2_regularization);
	let negative_loss_parent = compute_negative_loss(sum_gradients, sum_hessians, l2_regularization);
	let mut best: Option<ChooseBestSplitOutput> = None;
	let mut left_n_examples = invalid.count;
	let mut left_sum_gradients = invalid.sum_gradients;
	let mut left_sum_hessians = invalid.sum_hessians;
	// The last bin can never be the split point because it would send everything left.
	for bin_index in 0..entries.len() - 1 {
		if bin_index > 0 {
			let entry = &entries[bin_index];
			left_n_examples += entry.count;
			left_sum_gradients += entry.sum_gradients;
			left_sum_hessians += entry.sum_hessians;
		} else if invalid.count == 0 {
			continue;
		}
		let right_n_examples = n_examples - left_n_examples;
		let right_sum_gradients = sum_gradients - left_sum_gradients;
		let right_sum_hessians = sum_hessians - left_sum_hessians;
		if left_n_examples < options.min_examples_per_child
			|| right_n_examples < options.min_examples_per_child
		{
			continue;
		}
		if left_sum_hessians < f64::from(options.min_sum_hessians_per_child)
			|| right_sum_hessians < f64::from(options.min_sum_hessians_per_child)
		{
			continue;
		}
		let gain = compute_negative_loss(left_sum_gradients, left_sum_hessians, l2_regularization)
			+ compute_negative_loss(right_sum_gradients, right_sum_hessians, l2_regularization)
			- negative_loss_parent;
		let gain = gain as f32;
		if gain <= options.min_gain_to_split {
			continue;
		}
		if best.as_ref().map_or(false, |best| best.gain >= gain) {
			continue;
		}
		let split_value = if bin_index == 0 {
			f32::NEG_INFINITY
		} else {
			binning_instruction.thresholds[bin_index - 1]
		};
		let invalid_values_direction = if invalid.count > 0 || left_n_examples >= right_n_examples {
			SplitDirection::Left
		} else {
			SplitDirection::Right
		};
		best = Some(ChooseBestSplitOutput {
			gain,
			split: TrainBranchSplit {
				feature_index,
				split_value,
				bin_index,
				invalid_values_direction,
			},
			left_n_examples,
			left_sum_gradients,
			left_sum_hessians,
			right_n_examples,
			right_sum_gradients,
			right_sum_hessians,
		});
	}
	best
}

/// The negative loss of a node is `G^2 / (H + lambda)`. The gain of a split is the children's negative loss minus the parent's.
fn compute_negative_loss(sum_gradients: f64, sum_hessians: f64, l2_regularization: f64) -> f64 {
	(sum_gradients * sum_gradients) / (sum_hessians + l2_regularization)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::train::bin_stats::BinStatsEntry;

	fn entry(sum_gradients: f64, sum_hessians: f64, count: usize) -> BinStatsEntry {
		BinStatsEntry {
			sum_gradients,
			sum_hessians,
			count,
		}
	}

	#[test]
	fn test_chooses_bin_separating_gradients() {
		let binning_instructions = vec![BinningInstruction {
			thresholds: vec![1.5, 2.5, 3.5],
		}];
		let bin_stats = BinStats {
			entries: vec![vec![
				entry(0.0, 0.0, 0),
				entry(0.5, 0.25, 1),
				entry(0.5, 0.25, 1),
				entry(-0.5, 0.25, 1),
				entry(-0.5, 0.25, 1),
			]],
		};
		let options = TrainOptions {
			min_examples_per_child: 1,
			..Default::default()
		};
		let output =
			choose_best_split(&binning_instructions, &bin_stats, &[0], 4, 0.0, 1.0, &options).unwrap();
		assert_eq!(output.split.bin_index, 2);
		assert_eq!(output.split.split_value, 2.5);
		assert_eq!(output.split.invalid_values_direction, SplitDirection::Left);
		assert_eq!(output.gain, 4.0);
		assert_eq!(output.left_n_examples, 2);
		assert_eq!(output.right_sum_gradients, -1.0);
	}

	#[test]
	fn test_respects_min_examples_per_child() {
		let binning_instructions = vec![BinningInstruction {
			thresholds: vec![1.5, 2.5, 3.5],
		}];
		let bin_stats = BinStats {
			entries: vec![vec![
				entry(0.0, 0.0, 0),
				entry(0.5, 0.25, 1),
				entry(0.5, 0.25, 1),
				entry(-0.5, 0.25, 1),
				entry(-0.5, 0.25, 1),
			]],
		};
		let options = TrainOptions {
			min_examples_per_child: 3,
			..Default::default()
		};
		assert!(
			choose_best_split(&binning_instructions, &bin_stats, &[0], 4, 0.0, 1.0, &options)
				.is_none()
		);
	}

	#[test]
	fn test_missing_values_can_be_split_off() {
		let binning_instructions = vec![BinningInstruction { thresholds: vec![] }];
		let bin_stats = BinStats {
			entries: vec![vec![entry(1.0, 0.5, 2), entry(-1.0, 0.5, 2)]],
		};
		let options = TrainOptions {
			min_examples_per_child: 1,
			..Default::default()
		};
		let output =
			choose_best_split(&binning_instructions, &bin_stats, &[0], 4, 0.0, 1.0, &options).unwrap();
		assert_eq!(output.split.bin_index, 0);
		assert_eq!(output.split.split_value, f32::NEG_INFINITY);
		assert_eq!(output.split.invalid_values_direction, SplitDirection::Left);
	}
}
