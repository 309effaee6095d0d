use insurance_pipeline::{Artifact, Hook, Node, NodeInputs, PipelineError};

/// Logs the start and end of every node.
pub struct NodeHooks;

impl Hook for NodeHooks {
	fn before_node_run(&self, node: &Node, _inputs: &NodeInputs) {
		tracing::info!("Running node: {}", node.name());
	}

	fn after_node_run(&self, node: &Node, _inputs: &NodeInputs, _outputs: &[Artifact]) {
		tracing::info!("Completed node: {}", node.name());
	}

	fn on_node_error(&self, node: &Node, error: &PipelineError) {
		tracing::error!("Node {} failed: {}", node.name(), error);
	}
}
