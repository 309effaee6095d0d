use crate::TrainOptions;
use insurance_util::finite::Finite;
use itertools::Itertools;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

/*
This struct specifies how to bin a number feature. The first bin is reserved for invalid values, and after that feature values are binned by comparing them with a set of thresholds. For example, given the thresholds `[0.5, 1.5, 2]`, the bins will be:
0. invalid values
1. (-infinity, 0.5]
2. (0.5, 1.5]
3. (1.5, 2]
4. (2, infinity)
*/
#[derive(Clone, Debug, PartialEq)]
pub struct BinningInstruction {
	pub thresholds: Vec<f32>,
}

impl BinningInstruction {
	pub fn n_bins(&self) -> usize {
		self.thresholds.len() + 2
	}

	pub fn bin(&self, value: f32) -> u8 {
		if value.is_nan() {
			return 0;
		}
		// There are at most 254 thresholds, so the bin always fits in a u8.
		(1 + self.thresholds.partition_point(|threshold| *threshold < value)) as u8
	}
}

/// Compute the binning instructions for each column in `features`.
pub fn compute_binning_instructions(
	features: ArrayView2<f32>,
	options: &TrainOptions,
) -> Vec<BinningInstruction> {
	let columns: Vec<ArrayView1<f32>> = features.axis_iter(Axis(1)).collect();
	columns
		.par_iter()
		.map(|column| BinningInstruction {
			thresholds: compute_thresholds(column.view(), options),
		})
		.collect()
}

/// If the number of unique values is less than `max_valid_bins_for_number_features`, the thresholds are the midpoints between consecutive unique values. Otherwise, they are evenly spaced quantiles.
fn compute_thresholds(column: ArrayView1<f32>, options: &TrainOptions) -> Vec<f32> {
	let mut histogram: BTreeMap<Finite<f32>, usize> = BTreeMap::new();
	let mut histogram_values_count = 0;
	for value in column
		.iter()
		.take(options.max_examples_for_computing_bin_thresholds)
	{
		if let Ok(value) = Finite::new(*value) {
			*histogram.entry(value).or_insert(0) += 1;
			histogram_values_count += 1;
		}
	}
	let max_valid_bins = options.max_valid_bins_for_number_features as usize;
	if histogram.len() < max_valid_bins {
		histogram
			.keys()
			.tuple_windows()
			.map(|(a, b)| (a.get() + b.get()) / 2.0)
			.collect()
	} else {
		compute_quantile_thresholds(histogram, histogram_values_count, max_valid_bins)
	}
}

fn compute_quantile_thresholds(
	histogram: BTreeMap<Finite<f32>, usize>,
	histogram_values_count: usize,
	max_valid_bins: usize,
) -> Vec<f32> {
	// Each entry holds a value and the number of values less than or equal to it.
	let cumulative: Vec<(f32, usize)> = histogram
		.into_iter()
		.scan(0, |seen, (value, count)| {
			*seen += count;
			Some((value.get(), *seen))
		})
		.collect();
	let value_at_rank = |rank: usize| {
		let index = cumulative.partition_point(|(_, seen)| *seen <= rank);
		cumulative[index].0
	};
	let last_rank = histogram_values_count.saturating_sub(1) as f32;
	let mut thresholds: Vec<f32> = (1..max_valid_bins)
		.map(|i| {
			let position = last_rank * i as f32 / max_valid_bins as f32;
			let rank = position.trunc() as usize;
			let fract = position.fract();
			let value = value_at_rank(rank);
			if fract > 0.0 {
				value * (1.0 - fract) + value_at_rank(rank + 1) * fract
			} else {
				value
			}
		})
		.collect();
	thresholds.dedup();
	thresholds
}

/// The binned features are stored column major, one `u8` bin per example.
#[derive(Debug)]
pub struct BinnedFeatures {
	pub columns: Vec<Vec<u8>>,
}

pub fn compute_binned_features(
	features: ArrayView2<f32>,
	binning_instructions: &[BinningInstruction],
) -> BinnedFeatures {
	let columns: Vec<ArrayView1<f32>> = features.axis_iter(Axis(1)).collect();
	let columns = columns
		.par_iter()
		.zip(binning_instructions.par_iter())
		.map(|(column, binning_instruction)| {
			column
				.iter()
				.map(|value| binning_instruction.bin(*value))
				.collect()
		})
		.collect();
	BinnedFeatures { columns }
}
