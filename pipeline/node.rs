use crate::{Artifact, PipelineError};
use serde::de::DeserializeOwned;
use std::{any::type_name, fmt, sync::Arc};

type NodeFn = dyn Fn(&NodeInputs) -> anyhow::Result<Vec<Artifact>> + Send + Sync;

/// A `Node` is a named step in a pipeline. Its function receives the artifacts named by `inputs`, in order, and must return one artifact for each name in `outputs`.
#[derive(Clone)]
pub struct Node {
	name: String,
	inputs: Vec<String>,
	outputs: Vec<String>,
	func: Arc<NodeFn>,
}

impl Node {
	pub fn new<F>(name: &str, inputs: &[&str], outputs: &[&str], func: F) -> Self
	where
		F: Fn(&NodeInputs) -> anyhow::Result<Vec<Artifact>> + Send + Sync + 'static,
	{
		Self {
			name: name.to_owned(),
			inputs: inputs.iter().map(|input| (*input).to_owned()).collect(),
			outputs: outputs.iter().map(|output| (*output).to_owned()).collect(),
			func: Arc::new(func),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn inputs(&self) -> &[String] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[String] {
		&self.outputs
	}

	/// Two nodes have the same definition if they have the same name, inputs and outputs. Functions cannot be compared.
	pub fn same_definition(&self, other: &Node) -> bool {
		self.name == other.name && self.inputs == other.inputs && self.outputs == other.outputs
	}

	/// Run the node's function and check that it returned as many outputs as it declares.
	pub fn run(&self, inputs: &NodeInputs) -> Result<Vec<Artifact>, PipelineError> {
		let outputs = (self.func)(inputs).map_err(|source| PipelineError::NodeFailed {
			node: self.name.clone(),
			source,
		})?;
		if outputs.len() != self.outputs.len() {
			return Err(PipelineError::OutputCountMismatch {
				node: self.name.clone(),
				expected: self.outputs.len(),
				actual: outputs.len(),
			});
		}
		Ok(outputs)
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("name", &self.name)
			.field("inputs", &self.inputs)
			.field("outputs", &self.outputs)
			.finish()
	}
}

/// The artifacts passed to a node's function, in the order the node declared its inputs.
#[derive(Debug)]
pub struct NodeInputs {
	node: String,
	inputs: Vec<(String, Artifact)>,
}

impl NodeInputs {
	pub fn new(node: &str, inputs: Vec<(String, Artifact)>) -> Self {
		Self {
			node: node.to_owned(),
			inputs,
		}
	}

	pub fn len(&self) -> usize {
		self.inputs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inputs.is_empty()
	}

	/// Get a reference to the input at `index` as a `T`.
	pub fn get<T: 'static>(&self, index: usize) -> Result<&T, PipelineError> {
		let (name, artifact) = self.entry(index)?;
		artifact
			.downcast_ref::<T>()
			.ok_or_else(|| PipelineError::TypeMismatch {
				name: name.clone(),
				expected: type_name::<T>(),
				actual: artifact.type_name(),
			})
	}

	/// Deserialize a JSON valued input, such as a `params:` input, into a `T`.
	pub fn param<T: DeserializeOwned>(&self, index: usize) -> Result<T, PipelineError> {
		let value: &serde_json::Value = self.get(index)?;
		let name = &self.entry(index)?.0;
		serde_json::from_value(value.clone()).map_err(|source| PipelineError::InvalidParameter {
			name: name.clone(),
			source,
		})
	}

	fn entry(&self, index: usize) -> Result<&(String, Artifact), PipelineError> {
		self.inputs.get(index).ok_or_else(|| PipelineError::InputIndex {
			node: self.node.clone(),
			index,
		})
	}
}
