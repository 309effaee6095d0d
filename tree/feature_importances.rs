use crate::{Node, Tree};

/// This function computes feature importances using the "split" method, where a feature's importance is proportional to the number of branches that split on it. If no tree has a branch, every importance is zero.
pub fn compute_feature_importances(trees: &[Tree], n_features: usize) -> Vec<f32> {
	let mut feature_importances = vec![0.0; n_features];
	for node in trees.iter().flat_map(|tree| tree.nodes.iter()) {
		if let Node::Branch(branch) = node {
			feature_importances[branch.split.feature_index] += 1.0;
		}
	}
	let total = feature_importances.iter().sum::<f32>();
	if total > 0.0 {
		for feature_importance in feature_importances.iter_mut() {
			*feature_importance /= total;
		}
	}
	feature_importances
}
