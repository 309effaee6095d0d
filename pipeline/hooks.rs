use crate::{Artifact, Node, NodeInputs, Pipeline, PipelineError};

/// A `Hook` is called around pipeline and node execution. Every method does nothing by default.
pub trait Hook {
	fn before_pipeline_run(&self, _pipeline: &Pipeline) {}

	fn before_node_run(&self, _node: &Node, _inputs: &NodeInputs) {}

	fn after_node_run(&self, _node: &Node, _inputs: &NodeInputs, _outputs: &[Artifact]) {}

	fn on_node_error(&self, _node: &Node, _error: &PipelineError) {}

	fn after_pipeline_run(&self, _pipeline: &Pipeline) {}
}
