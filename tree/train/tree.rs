use super::{
	bin_stats::BinStats,
	binning::{BinnedFeatures, BinningInstruction},
	split::{choose_best_split, ChooseBestSplitOutput},
};
use crate::{BranchNode, BranchSplit, LeafNode, Node, SplitDirection, TrainOptions, Tree};
use std::{cmp::Ordering, collections::BinaryHeap, ops::Range};

/// A tree as it is built during training. Branches remember the bin they split on so examples can be routed using the binned features.
#[derive(Debug)]
pub struct TrainTree {
	pub nodes: Vec<TrainNode>,
}

impl TrainTree {
	/// Make a prediction for the example at `example_index` in the binned features.
	pub fn predict_binned(&self, binned_features: &BinnedFeatures, example_index: usize) -> f32 {
		let mut node_index = 0;
		loop {
			match &self.nodes[node_index] {
				TrainNode::Branch(TrainBranchNode {
					left_child_index,
					right_child_index,
					split,
					..
				}) => {
					let bin = binned_features.columns[split.feature_index][example_index];
					node_index = match split.direction_for_bin(bin) {
						SplitDirection::Left => *left_child_index,
						SplitDirection::Right => *right_child_index,
					};
				}
				TrainNode::Leaf(TrainLeafNode { value, .. }) => return *value,
			}
		}
	}
}

impl From<TrainTree> for Tree {
	fn from(tree: TrainTree) -> Tree {
		let nodes = tree
			.nodes
			.into_iter()
			.map(|node| match node {
				TrainNode::Branch(branch) => Node::Branch(BranchNode {
					left_child_index: branch.left_child_index,
					right_child_index: branch.right_child_index,
					split: BranchSplit {
						feature_index: branch.split.feature_index,
						split_value: branch.split.split_value,
						invalid_values_direction: branch.split.invalid_values_direction,
					},
					examples_fraction: branch.examples_fraction,
				}),
				TrainNode::Leaf(leaf) => Node::Leaf(LeafNode {
					value: leaf.value,
					examples_fraction: leaf.examples_fraction,
				}),
			})
			.collect();
		Tree { nodes }
	}
}

#[derive(Debug)]
pub enum TrainNode {
	Branch(TrainBranchNode),
	Leaf(TrainLeafNode),
}

/// Child indexes are zero until the child is added. The root is never a child, so zero is never a valid child index.
#[derive(Debug)]
pub struct TrainBranchNode {
	pub left_child_index: usize,
	pub right_child_index: usize,
	pub split: TrainBranchSplit,
	pub examples_fraction: f32,
}

#[derive(Clone, Debug)]
pub struct TrainBranchSplit {
	pub feature_index: usize,
	/// Valid values less than or equal to this go left.
	pub split_value: f32,
	/// Valid bins less than or equal to this go left.
	pub bin_index: usize,
	pub invalid_values_direction: SplitDirection,
}

impl TrainBranchSplit {
	pub fn direction_for_bin(&self, bin: u8) -> SplitDirection {
		if bin == 0 {
			self.invalid_values_direction
		} else if bin as usize <= self.bin_index {
			SplitDirection::Left
		} else {
			SplitDirection::Right
		}
	}
}

#[derive(Debug)]
pub struct TrainLeafNode {
	pub value: f32,
	pub examples_fraction: f32,
}

struct QueueItem {
	/// The priority queue will be sorted by the gain of the split.
	gain: f32,
	/// The queue item holds a reference to its parent so that it can update the parent's left or right child index if the queue item becomes a node added to the tree.
	parent_index_and_direction: Option<(usize, SplitDirection)>,
	depth: usize,
	bin_stats: BinStats,
	/// The range of entries in the examples index that reach this node.
	examples_index_range: Range<usize>,
	sum_gradients: f64,
	sum_hessians: f64,
	split: ChooseBestSplitOutput,
}

impl PartialEq for QueueItem {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for QueueItem {
	fn cmp(&self, other: &Self) -> Ordering {
		self.gain.total_cmp(&other.gain)
	}
}

/// The examples that reach a node, along with what is needed to try to split it.
struct Candidate {
	parent_index_and_direction: Option<(usize, SplitDirection)>,
	depth: usize,
	examples_index_range: Range<usize>,
	sum_gradients: f64,
	sum_hessians: f64,
}

/// Train a tree leaf-wise. The leaf with the highest gain split is split next until `max_leaf_nodes` is reached or no leaf can be split. `examples_index` holds the examples used for this tree and is rearranged so that each node's examples are contiguous.
#[allow(clippy::too_many_arguments)]
pub fn train_tree(
	binning_instructions: &[BinningInstruction],
	binned_features: &BinnedFeatures,
	feature_indexes: &[usize],
	gradients: &[f32],
	hessians: &[f32],
	examples_index: &mut [usize],
	options: &TrainOptions,
) -> TrainTree {
	let mut builder = TreeBuilder {
		binning_instructions,
		feature_indexes,
		options,
		n_examples_root: examples_index.len(),
		nodes: Vec::new(),
		n_leaves: 0,
	};
	let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();

	let (sum_gradients_root, sum_hessians_root) = examples_index.iter().fold(
		(0.0, 0.0),
		|(sum_gradients, sum_hessians), example_index| {
			(
				sum_gradients + f64::from(gradients[*example_index]),
				sum_hessians + f64::from(hessians[*example_index]),
			)
		},
	);
	let root = Candidate {
		parent_index_and_direction: None,
		depth: 0,
		examples_index_range: 0..examples_index.len(),
		sum_gradients: sum_gradients_root,
		sum_hessians: sum_hessians_root,
	};
	if builder.can_split(&root) {
		let bin_stats = BinStats::compute(
			binning_instructions,
			binned_features,
			feature_indexes,
			gradients,
			hessians,
			examples_index,
		);
		builder.try_enqueue(&mut queue, root, bin_stats);
	} else {
		builder.add_leaf(&root);
	}

	loop {
		// Every item remaining on the queue will become a leaf, so stop once they would reach the limit.
		if builder.n_leaves + queue.len() >= options.max_leaf_nodes {
			break;
		}
		let queue_item = match queue.pop() {
			Some(queue_item) => queue_item,
			None => break,
		};

		// Create the new branch node.
		let node_index = builder.nodes.len();
		let examples_fraction =
			queue_item.examples_index_range.len() as f32 / builder.n_examples_root as f32;
		builder.nodes.push(TrainNode::Branch(TrainBranchNode {
			left_child_index: 0,
			right_child_index: 0,
			split: queue_item.split.split.clone(),
			examples_fraction,
		}));
		builder.link_to_parent(queue_item.parent_index_and_direction, node_index);

		// Rearrange the examples index so the left child's examples come first.
		let range = queue_item.examples_index_range.clone();
		let n_left = rearrange_examples_index(
			binned_features,
			&queue_item.split.split,
			&mut examples_index[range.clone()],
		);
		debug_assert_eq!(n_left, queue_item.split.left_n_examples);
		debug_assert_eq!(range.len() - n_left, queue_item.split.right_n_examples);
		let left_range = range.start..range.start + n_left;
		let right_range = range.start + n_left..range.end;

		let split = &queue_item.split;
		let left = Candidate {
			parent_index_and_direction: Some((node_index, SplitDirection::Left)),
			depth: queue_item.depth + 1,
			examples_index_range: left_range,
			sum_gradients: split.left_sum_gradients,
			sum_hessians: split.left_sum_hessians,
		};
		let right = Candidate {
			parent_index_and_direction: Some((node_index, SplitDirection::Right)),
			depth: queue_item.depth + 1,
			examples_index_range: right_range,
			sum_gradients: split.right_sum_gradients,
			sum_hessians: split.right_sum_hessians,
		};
		let should_try_to_split_left = builder.can_split(&left);
		let should_try_to_split_right = builder.can_split(&right);
		if !should_try_to_split_left && !should_try_to_split_right {
			builder.add_leaf(&left);
			builder.add_leaf(&right);
			continue;
		}

		// Compute the bin stats for the child with fewer examples directly and derive the other child's by subtracting them from the parent's.
		let left_is_smaller = left.examples_index_range.len() < right.examples_index_range.len();
		let smaller_range = if left_is_smaller {
			left.examples_index_range.clone()
		} else {
			right.examples_index_range.clone()
		};
		let smaller_bin_stats = BinStats::compute(
			binning_instructions,
			binned_features,
			feature_indexes,
			gradients,
			hessians,
			&examples_index[smaller_range],
		);
		let mut larger_bin_stats = queue_item.bin_stats;
		larger_bin_stats.subtract(&smaller_bin_stats);
		let (left_bin_stats, right_bin_stats) = if left_is_smaller {
			(smaller_bin_stats, larger_bin_stats)
		} else {
			(larger_bin_stats, smaller_bin_stats)
		};

		if should_try_to_split_left {
			builder.try_enqueue(&mut queue, left, left_bin_stats);
		} else {
			builder.add_leaf(&left);
		}
		if should_try_to_split_right {
			builder.try_enqueue(&mut queue, right, right_bin_stats);
		} else {
			builder.add_leaf(&right);
		}
	}

	// The remaining items on the queue become leaves.
	while let Some(queue_item) = queue.pop() {
		builder.add_leaf(&Candidate {
			parent_index_and_direction: queue_item.parent_index_and_direction,
			depth: queue_item.depth,
			examples_index_range: queue_item.examples_index_range,
			sum_gradients: queue_item.sum_gradients,
			sum_hessians: queue_item.sum_hessians,
		});
	}

	TrainTree {
		nodes: builder.nodes,
	}
}

struct TreeBuilder<'a> {
	binning_instructions: &'a [BinningInstruction],
	feature_indexes: &'a [usize],
	options: &'a TrainOptions,
	n_examples_root: usize,
	nodes: Vec<TrainNode>,
	n_leaves: usize,
}

impl<'a> TreeBuilder<'a> {
	/// A node may be split if it is shallow enough and has enough examples for both children.
	fn can_split(&self, candidate: &Candidate) -> bool {
		let depth_allows_split = match self.options.max_depth {
			Some(max_depth) => candidate.depth < max_depth,
			None => true,
		};
		depth_allows_split
			&& candidate.examples_index_range.len() >= 2 * self.options.min_examples_per_child.max(1)
			&& candidate.sum_hessians >= 2.0 * f64::from(self.options.min_sum_hessians_per_child)
	}

	/// Choose the best split for the candidate and push it on the queue, or add it as a leaf if there is no valid split.
	fn try_enqueue(&mut self, queue: &mut BinaryHeap<QueueItem>, candidate: Candidate, bin_stats: BinStats) {
		let split = choose_best_split(
			self.binning_instructions,
			&bin_stats,
			self.feature_indexes,
			candidate.examples_index_range.len(),
			candidate.sum_gradients,
			candidate.sum_hessians,
			self.options,
		);
		match split {
			Some(split) => queue.push(QueueItem {
				gain: split.gain,
				parent_index_and_direction: candidate.parent_index_and_direction,
				depth: candidate.depth,
				bin_stats,
				examples_index_range: candidate.examples_index_range,
				sum_gradients: candidate.sum_gradients,
				sum_hessians: candidate.sum_hessians,
				split,
			}),
			None => self.add_leaf(&candidate),
		}
	}

	/// Add a leaf to the list of nodes and update the parent to refer to it.
	fn add_leaf(&mut self, candidate: &Candidate) {
		let leaf_index = self.nodes.len();
		let value = (-f64::from(self.options.learning_rate) * candidate.sum_gradients
			/ (candidate.sum_hessians + f64::from(self.options.l2_regularization) + f64::EPSILON))
			as f32;
		let examples_fraction =
			candidate.examples_index_range.len() as f32 / self.n_examples_root.max(1) as f32;
		self.nodes.push(TrainNode::Leaf(TrainLeafNode {
			value,
			examples_fraction,
		}));
		self.n_leaves += 1;
		self.link_to_parent(candidate.parent_index_and_direction, leaf_index);
	}

	fn link_to_parent(&mut self, parent_index_and_direction: Option<(usize, SplitDirection)>, node_index: usize) {
		if let Some((parent_index, direction)) = parent_index_and_direction {
			if let TrainNode::Branch(parent) = &mut self.nodes[parent_index] {
				match direction {
					SplitDirection::Left => parent.left_child_index = node_index,
					SplitDirection::Right => parent.right_child_index = node_index,
				}
			}
		}
	}
}

/// Partition the examples so those sent left by `split` come first, keeping their relative order. Returns the number sent left.
fn rearrange_examples_index(
	binned_features: &BinnedFeatures,
	split: &TrainBranchSplit,
	examples_index: &mut [usize],
) -> usize {
	let binned_values = &binned_features.columns[split.feature_index];
	let (left, right): (Vec<usize>, Vec<usize>) =
		examples_index.iter().partition(|example_index| {
			split.direction_for_bin(binned_values[**example_index]) == SplitDirection::Left
		});
	examples_index[..left.len()].copy_from_slice(&left);
	examples_index[left.len()..].copy_from_slice(&right);
	left.len()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::train::binning::{compute_binned_features, compute_binning_instructions};
	use ndarray::prelude::*;

	fn train_single_tree(features: Array2<f32>, gradients: &[f32], options: &TrainOptions) -> TrainTree {
		let binning_instructions = compute_binning_instructions(features.view(), options);
		let binned_features = compute_binned_features(features.view(), &binning_instructions);
		let hessians = vec![0.25; gradients.len()];
		let feature_indexes: Vec<usize> = (0..features.ncols()).collect();
		let mut examples_index: Vec<usize> = (0..features.nrows()).collect();
		train_tree(
			&binning_instructions,
			&binned_features,
			&feature_indexes,
			gradients,
			&hessians,
			&mut examples_index,
			options,
		)
	}

	#[test]
	fn test_single_split() {
		let features = arr2(&[[1.0f32], [2.0], [3.0], [4.0]]);
		let options = TrainOptions {
			min_examples_per_child: 1,
			..Default::default()
		};
		let tree: Tree = train_single_tree(features, &[0.5, 0.5, -0.5, -0.5], &options).into();
		assert_eq!(tree.nodes.len(), 3);
		match &tree.nodes[0] {
			Node::Branch(branch) => {
				assert_eq!(branch.split.split_value, 2.5);
				assert_eq!(branch.left_child_index, 1);
				assert_eq!(branch.right_child_index, 2);
			}
			Node::Leaf(_) => panic!("expected the root to be a branch"),
		}
		assert!((tree.predict(&[1.0]) + 0.2).abs() < 1e-6);
		assert!((tree.predict(&[4.0]) - 0.2).abs() < 1e-6);
		assert_eq!(tree.nodes[1].examples_fraction(), 0.5);
	}

	#[test]
	fn test_max_leaf_nodes() {
		let features = arr2(&[[1.0f32], [2.0], [3.0], [4.0], [5.0], [6.0]]);
		let gradients = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
		let options = TrainOptions {
			min_examples_per_child: 1,
			max_leaf_nodes: 2,
			..Default::default()
		};
		let tree = train_single_tree(features, &gradients, &options);
		let n_leaves = tree
			.nodes
			.iter()
			.filter(|node| matches!(node, TrainNode::Leaf(_)))
			.count();
		assert_eq!(n_leaves, 2);
	}

	#[test]
	fn test_max_depth() {
		let features = arr2(&[[1.0f32], [2.0], [3.0], [4.0], [5.0], [6.0]]);
		let gradients = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
		let options = TrainOptions {
			min_examples_per_child: 1,
			max_depth: Some(1),
			..Default::default()
		};
		let tree = train_single_tree(features, &gradients, &options);
		assert_eq!(tree.nodes.len(), 3);
	}

	#[test]
	fn test_binned_prediction_matches_tree_prediction() {
		let features = arr2(&[[1.0f32], [f32::NAN], [3.0], [4.0], [f32::NAN], [6.0]]);
		let gradients = [0.5, -0.5, 0.5, -0.5, -0.5, 0.5];
		let options = TrainOptions {
			min_examples_per_child: 1,
			..Default::default()
		};
		let binning_instructions = compute_binning_instructions(features.view(), &options);
		let binned_features = compute_binned_features(features.view(), &binning_instructions);
		let mut examples_index: Vec<usize> = (0..6).collect();
		let trained = train_tree(
			&binning_instructions,
			&binned_features,
			&[0],
			&gradients,
			&[0.25; 6],
			&mut examples_index,
			&options,
		);
		let binned_predictions: Vec<f32> = (0..6)
			.map(|example_index| trained.predict_binned(&binned_features, example_index))
			.collect();
		let tree: Tree = trained.into();
		let predictions: Vec<f32> = features
			.axis_iter(Axis(0))
			.map(|row| tree.predict(&row.to_vec()))
			.collect();
		assert_eq!(binned_predictions, predictions);
	}
}
