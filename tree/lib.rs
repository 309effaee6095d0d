/*!
This crate implements binary classification with an ensemble of gradient boosted decision trees. It works like [LightGBM](https://github.com/microsoft/lightgbm) and similar libraries: number features are binned, histograms of gradients and hessians are accumulated per bin, and each tree is grown leaf-wise by repeatedly splitting the leaf with the highest gain.

```
use insurance_tree::{BinaryClassifier, TrainOptions};
use ndarray::prelude::*;

let features = arr2(&[[1.0f32], [2.0], [3.0], [4.0]]);
let labels = arr1(&[false, false, true, true]);
let options = TrainOptions {
	min_examples_per_child: 1,
	..Default::default()
};
let model = BinaryClassifier::train(features.view(), labels.view(), &options).unwrap();
let predictions = model.predict(features.view());
assert_eq!(predictions, labels);
```
*/

#![allow(clippy::tabs_in_doc_comments)]

use serde::{Deserialize, Serialize};

mod binary_classifier;
mod feature_importances;
mod train;

pub use self::binary_classifier::BinaryClassifier;

/// These are the options passed to `BinaryClassifier::train`.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainOptions {
	/// If true, the model will include the loss on the training data after each round.
	pub compute_loss: bool,
	/// This option sets the L2 regularization value, which helps avoid overfitting.
	pub l2_regularization: f32,
	/// The learning rate scales the leaf values to control the effect each tree has on the output.
	pub learning_rate: f32,
	/// The depth of a single tree will never exceed this value. `None` leaves the depth unlimited.
	pub max_depth: Option<usize>,
	/// The number of leaf nodes in a single tree will never exceed this value.
	pub max_leaf_nodes: usize,
	/// This is the number of rounds of training, each of which adds one tree.
	pub max_rounds: usize,
	/// When computing the bin thresholds for number features, this is the maximum number of bins for valid values to create. If the number of unique values in the number feature is less than this value, the thresholds will be the midpoints between the unique values.
	pub max_valid_bins_for_number_features: u8,
	/// This is the maximum number of examples to consider when determining the bin thresholds for number features.
	pub max_examples_for_computing_bin_thresholds: usize,
	/// A split will only be considered valid if the number of training examples sent to each of the resulting children is at least this value.
	pub min_examples_per_child: usize,
	/// A node will only be split if the best split achieves at least this minimum gain.
	pub min_gain_to_split: f32,
	/// A split will only be considered valid if the sum of hessians in each of the resulting children is at least this value.
	pub min_sum_hessians_per_child: f32,
	/// The fraction of training examples sampled without replacement for each round.
	pub row_subsample_fraction: f32,
	/// The fraction of features each tree may split on, sampled once per tree.
	pub column_subsample_fraction: f32,
	/// The seed for row and column sampling.
	pub seed: u64,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			compute_loss: false,
			l2_regularization: 0.0,
			learning_rate: 0.1,
			max_depth: None,
			max_leaf_nodes: 31,
			max_rounds: 100,
			max_valid_bins_for_number_features: 255,
			max_examples_for_computing_bin_thresholds: 200_000,
			min_examples_per_child: 20,
			min_gain_to_split: 0.0,
			min_sum_hessians_per_child: 1e-3,
			row_subsample_fraction: 1.0,
			column_subsample_fraction: 1.0,
			seed: 0,
		}
	}
}

/// Trees are stored as a `Vec` of `Node`s. Each branch in the tree has two indexes into the `Vec`, one for each of its children. The root is the first node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for a given example.
	pub fn predict(&self, features: &[f32]) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					split,
					..
				}) => {
					node_index = match split.direction(features[split.feature_index]) {
						SplitDirection::Left => *left_child_index,
						SplitDirection::Right => *right_child_index,
					};
				}
				Node::Leaf(LeafNode { value, .. }) => return *value,
			}
		}
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

impl Node {
	pub fn examples_fraction(&self) -> f32 {
		match self {
			Self::Leaf(LeafNode {
				examples_fraction, ..
			}) => *examples_fraction,
			Self::Branch(BranchNode {
				examples_fraction, ..
			}) => *examples_fraction,
		}
	}
}

/// A `BranchNode` is a branch in a tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchNode {
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// When making predictions, an example will be sent either to the right or left child. The `split` contains the information necessary to determine which way it will go.
	pub split: BranchSplit,
	/// This is the fraction of the tree's training examples that passed through this branch.
	pub examples_fraction: f32,
}

/// A branch split takes the value of a single feature and compares it with `split_value`. If the value is <= `split_value`, the example is sent left, and if it is > `split_value`, it is sent right. Missing values are sent in `invalid_values_direction`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchSplit {
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	/// This is the threshold value of the split.
	pub split_value: f32,
	/// This is the direction invalid values should be sent.
	pub invalid_values_direction: SplitDirection,
}

impl BranchSplit {
	pub fn direction(&self, value: f32) -> SplitDirection {
		if value.is_nan() {
			self.invalid_values_direction
		} else if value <= self.split_value {
			SplitDirection::Left
		} else {
			SplitDirection::Right
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitDirection {
	Left,
	Right,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafNode {
	/// This is the value to output.
	pub value: f32,
	/// This is the fraction of the tree's training examples that were sent to this leaf.
	pub examples_fraction: f32,
}
