use crate::{Node, PipelineError};
use std::{
	collections::{BTreeMap, BTreeSet},
	ops::Add,
};

/// A `Pipeline` is a collection of nodes. The order nodes run in is determined by their inputs and outputs, not by the order they were declared in.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
	nodes: Vec<Node>,
}

impl Pipeline {
	pub fn new(nodes: Vec<Node>) -> Self {
		nodes
			.into_iter()
			.fold(Pipeline::default(), |mut pipeline, node| {
				pipeline.push(node);
				pipeline
			})
	}

	/// The nodes in declaration order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn node_names(&self) -> Vec<&str> {
		self.nodes.iter().map(|node| node.name()).collect()
	}

	/// The names this pipeline reads but does not produce, in the order they are first read.
	pub fn inputs(&self) -> Vec<String> {
		let produced: BTreeSet<&str> = self
			.nodes
			.iter()
			.flat_map(|node| node.outputs().iter().map(String::as_str))
			.collect();
		let mut inputs: Vec<String> = Vec::new();
		for input in self.nodes.iter().flat_map(|node| node.inputs()) {
			if !produced.contains(input.as_str()) && !inputs.contains(input) {
				inputs.push(input.clone());
			}
		}
		inputs
	}

	/// The names this pipeline produces but does not read, in declaration order.
	pub fn outputs(&self) -> Vec<String> {
		let consumed: BTreeSet<&str> = self
			.nodes
			.iter()
			.flat_map(|node| node.inputs().iter().map(String::as_str))
			.collect();
		self.nodes
			.iter()
			.flat_map(|node| node.outputs())
			.filter(|output| !consumed.contains(output.as_str()))
			.cloned()
			.collect()
	}

	/// Keep only the named nodes, in their declaration order.
	pub fn only_nodes(&self, names: &[&str]) -> Result<Pipeline, PipelineError> {
		for name in names {
			if !self.nodes.iter().any(|node| node.name() == *name) {
				return Err(PipelineError::UnknownNode((*name).to_owned()));
			}
		}
		let nodes = self
			.nodes
			.iter()
			.filter(|node| names.contains(&node.name()))
			.cloned()
			.collect();
		Ok(Pipeline { nodes })
	}

	/// Check that node names are unique, every output has a single producer, and there are no cycles.
	pub fn validate(&self) -> Result<(), PipelineError> {
		let mut names = BTreeSet::new();
		for node in self.nodes.iter() {
			if !names.insert(node.name()) {
				return Err(PipelineError::DuplicateNode(node.name().to_owned()));
			}
		}
		let mut producers: BTreeMap<&str, &str> = BTreeMap::new();
		for node in self.nodes.iter() {
			for output in node.outputs() {
				if let Some(first) = producers.insert(output.as_str(), node.name()) {
					return Err(PipelineError::DuplicateOutput {
						output: output.clone(),
						first: first.to_owned(),
						second: node.name().to_owned(),
					});
				}
			}
		}
		self.topological_order().map(|_| ())
	}

	/// Order the nodes with Kahn's algorithm so every node runs after the nodes producing its inputs. Among the nodes that are ready to run, the one declared first runs first.
	pub fn topological_order(&self) -> Result<Vec<&Node>, PipelineError> {
		let producers: BTreeMap<&str, usize> = self
			.nodes
			.iter()
			.enumerate()
			.flat_map(|(index, node)| {
				node.outputs()
					.iter()
					.map(move |output| (output.as_str(), index))
			})
			.collect();
		let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
		let mut in_degrees: Vec<usize> = vec![0; self.nodes.len()];
		for (index, node) in self.nodes.iter().enumerate() {
			let dependencies: BTreeSet<usize> = node
				.inputs()
				.iter()
				.filter_map(|input| producers.get(input.as_str()).copied())
				.collect();
			in_degrees[index] = dependencies.len();
			for dependency in dependencies {
				dependents[dependency].push(index);
			}
		}
		let mut ready: BTreeSet<usize> = in_degrees
			.iter()
			.enumerate()
			.filter(|(_, in_degree)| **in_degree == 0)
			.map(|(index, _)| index)
			.collect();
		let mut order = Vec::with_capacity(self.nodes.len());
		while let Some(index) = ready.pop_first() {
			order.push(&self.nodes[index]);
			for dependent in dependents[index].iter() {
				in_degrees[*dependent] -= 1;
				if in_degrees[*dependent] == 0 {
					ready.insert(*dependent);
				}
			}
		}
		if order.len() < self.nodes.len() {
			let cycle = self
				.nodes
				.iter()
				.zip(in_degrees.iter())
				.filter(|(_, in_degree)| **in_degree > 0)
				.map(|(node, _)| node.name().to_owned())
				.collect();
			return Err(PipelineError::Cycle(cycle));
		}
		Ok(order)
	}

	/// Add a node unless a node with the same name and definition is already present. A node with the same name but a different definition is kept so that `validate` reports it.
	fn push(&mut self, node: Node) {
		let is_duplicate = self
			.nodes
			.iter()
			.any(|existing| existing.same_definition(&node));
		if !is_duplicate {
			self.nodes.push(node);
		}
	}
}

impl Add for Pipeline {
	type Output = Pipeline;

	fn add(mut self, other: Pipeline) -> Pipeline {
		for node in other.nodes {
			self.push(node);
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Artifact;

	fn node(name: &str, inputs: &[&str], outputs: &[&str]) -> Node {
		let n_outputs = outputs.len();
		Node::new(name, inputs, outputs, move |_| {
			Ok((0..n_outputs).map(|_| Artifact::new(())).collect())
		})
	}

	#[test]
	fn test_topological_order() {
		let pipeline = Pipeline::new(vec![
			node("train", &["X_train", "params"], &["model"]),
			node("split", &["data"], &["X_train", "X_test"]),
			node("evaluate", &["model", "X_test"], &["metrics"]),
			node("load", &["path"], &["data"]),
		]);
		let order: Vec<&str> = pipeline
			.topological_order()
			.unwrap()
			.into_iter()
			.map(|node| node.name())
			.collect();
		assert_eq!(order, vec!["load", "split", "train", "evaluate"]);
		assert_eq!(pipeline.inputs(), vec!["params", "path"]);
		assert_eq!(pipeline.outputs(), vec!["metrics"]);
	}

	#[test]
	fn test_declaration_order_breaks_ties() {
		let pipeline = Pipeline::new(vec![
			node("b", &["x"], &["b_out"]),
			node("a", &["x"], &["a_out"]),
			node("c", &["a_out", "b_out"], &["c_out"]),
		]);
		let order: Vec<&str> = pipeline
			.topological_order()
			.unwrap()
			.into_iter()
			.map(|node| node.name())
			.collect();
		assert_eq!(order, vec!["b", "a", "c"]);
	}

	#[test]
	fn test_cycle() {
		let pipeline = Pipeline::new(vec![
			node("start", &["input"], &["a"]),
			node("forward", &["a", "c"], &["b"]),
			node("back", &["b"], &["c"]),
		]);
		let error = pipeline.validate().unwrap_err();
		insta::assert_snapshot!(error.to_string(), @"the pipeline contains a cycle through the nodes forward, back");
	}

	#[test]
	fn test_duplicate_output() {
		let pipeline = Pipeline::new(vec![
			node("first", &[], &["data"]),
			node("second", &[], &["data"]),
		]);
		assert!(matches!(
			pipeline.validate(),
			Err(PipelineError::DuplicateOutput { .. })
		));
	}

	#[test]
	fn test_add_deduplicates_by_name() {
		let dp = Pipeline::new(vec![node("load", &["path"], &["data"])]);
		let mt = Pipeline::new(vec![
			node("load", &["path"], &["data"]),
			node("train", &["data"], &["model"]),
		]);
		let pipeline = dp.clone() + mt;
		assert_eq!(pipeline.node_names(), vec!["load", "train"]);
		assert!(pipeline.validate().is_ok());
		let conflicting = dp + Pipeline::new(vec![node("load", &["other"], &["data"])]);
		assert!(matches!(
			conflicting.validate(),
			Err(PipelineError::DuplicateNode(name)) if name == "load"
		));
	}

	#[test]
	fn test_only_nodes() {
		let pipeline = Pipeline::new(vec![
			node("load", &["path"], &["data"]),
			node("train", &["data"], &["model"]),
		]);
		let train = pipeline.only_nodes(&["train"]).unwrap();
		assert_eq!(train.inputs(), vec!["data"]);
		assert!(matches!(
			pipeline.only_nodes(&["plot"]),
			Err(PipelineError::UnknownNode(_))
		));
	}
}
