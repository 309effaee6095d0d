use self::{
	binning::{compute_binned_features, compute_binning_instructions},
	tree::train_tree,
};
use crate::{
	binary_classifier::{compute_bias, compute_loss, update_gradients_and_hessians},
	feature_importances::compute_feature_importances,
	BinaryClassifier, TrainOptions, Tree,
};
use ndarray::prelude::*;
use rand::{seq::index::sample, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

mod bin_stats;
mod binning;
mod split;
mod tree;

/// Train a binary classifier with gradient boosting. Each round fits one tree to the gradients of the binary cross entropy loss at the current predictions.
pub fn train(
	features: ArrayView2<f32>,
	labels: ArrayView1<bool>,
	options: &TrainOptions,
) -> BinaryClassifier {
	let n_examples = features.nrows();
	let n_features = features.ncols();
	let labels: Vec<bool> = labels.iter().copied().collect();

	// Bin the features once up front. Every tree is trained on the binned values.
	let binning_instructions = compute_binning_instructions(features, options);
	let binned_features = compute_binned_features(features, &binning_instructions);

	let bias = compute_bias(&labels);
	let mut logits = vec![bias; n_examples];
	let mut gradients = vec![0.0; n_examples];
	let mut hessians = vec![0.0; n_examples];
	let mut losses = if options.compute_loss {
		Some(Vec::with_capacity(options.max_rounds))
	} else {
		None
	};
	let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
	let mut trees = Vec::with_capacity(options.max_rounds);

	for round_index in 0..options.max_rounds {
		update_gradients_and_hessians(&mut gradients, &mut hessians, &labels, &logits);
		let mut examples_index =
			sample_sorted(&mut rng, n_examples, options.row_subsample_fraction);
		let feature_indexes =
			sample_sorted(&mut rng, n_features, options.column_subsample_fraction);
		let tree = train_tree(
			&binning_instructions,
			&binned_features,
			&feature_indexes,
			&gradients,
			&hessians,
			&mut examples_index,
			options,
		);
		// Examples left out of the bag still receive the new tree's prediction.
		logits
			.par_iter_mut()
			.enumerate()
			.for_each(|(example_index, logit)| {
				*logit += tree.predict_binned(&binned_features, example_index);
			});
		if let Some(losses) = losses.as_mut() {
			let loss = compute_loss(&labels, &logits);
			tracing::debug!(round = round_index, loss, "trained tree");
			losses.push(loss);
		} else {
			tracing::debug!(round = round_index, n_nodes = tree.nodes.len(), "trained tree");
		}
		trees.push(tree);
	}

	let trees: Vec<Tree> = trees.into_iter().map(Tree::from).collect();
	let feature_importances = compute_feature_importances(&trees, n_features);
	BinaryClassifier {
		bias,
		trees,
		feature_importances,
		losses,
	}
}

/// Sample `round(fraction * n)` of the indexes `0..n` without replacement, but at least one, and return them sorted. A fraction of one or more keeps every index without consuming randomness.
fn sample_sorted(rng: &mut Xoshiro256Plus, n: usize, fraction: f32) -> Vec<usize> {
	if fraction >= 1.0 || n == 0 {
		return (0..n).collect();
	}
	let amount = ((fraction * n as f32).round() as usize).clamp(1, n);
	let mut indexes = sample(rng, n, amount).into_vec();
	indexes.sort_unstable();
	indexes
}

#[cfg(test)]
mod tests {
	use super::*;

	fn separable_data() -> (Array2<f32>, Array1<bool>) {
		let mut features = Array2::zeros((40, 2));
		let mut labels = Array1::from_elem(40, false);
		for i in 0..40 {
			features[(i, 0)] = i as f32;
			features[(i, 1)] = 1.0;
			labels[i] = i >= 20;
		}
		(features, labels)
	}

	#[test]
	fn test_losses_decrease() {
		let (features, labels) = separable_data();
		let options = TrainOptions {
			compute_loss: true,
			max_rounds: 10,
			min_examples_per_child: 5,
			..Default::default()
		};
		let model = train(features.view(), labels.view(), &options);
		let losses = model.losses.unwrap();
		assert_eq!(losses.len(), 10);
		assert!(losses.windows(2).all(|pair| pair[1] < pair[0]));
		assert_eq!(model.trees.len(), 10);
	}

	#[test]
	fn test_constant_feature_is_never_used() {
		let (features, labels) = separable_data();
		let options = TrainOptions {
			max_rounds: 5,
			min_examples_per_child: 5,
			..Default::default()
		};
		let model = train(features.view(), labels.view(), &options);
		assert_eq!(model.feature_importances, vec![1.0, 0.0]);
	}

	#[test]
	fn test_sampling_is_seeded() {
		let (features, labels) = separable_data();
		let options = TrainOptions {
			max_rounds: 5,
			min_examples_per_child: 2,
			row_subsample_fraction: 0.5,
			column_subsample_fraction: 0.5,
			seed: 42,
			..Default::default()
		};
		let a = train(features.view(), labels.view(), &options);
		let b = train(features.view(), labels.view(), &options);
		assert_eq!(a, b);
	}

	#[test]
	fn test_sample_sorted() {
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		let indexes = sample_sorted(&mut rng, 10, 0.34);
		assert_eq!(indexes.len(), 3);
		assert!(indexes.windows(2).all(|pair| pair[0] < pair[1]));
		assert_eq!(sample_sorted(&mut rng, 3, 0.01).len(), 1);
		assert_eq!(sample_sorted(&mut rng, 3, 1.0), vec![0, 1, 2]);
	}
}
