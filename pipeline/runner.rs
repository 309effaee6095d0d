use crate::{Artifact, DataCatalog, Hook, NodeInputs, Pipeline, PipelineError};
use std::collections::BTreeMap;

/// The `SequentialRunner` runs the nodes of a pipeline one at a time in topological order.
#[derive(Default)]
pub struct SequentialRunner {
	hooks: Vec<Box<dyn Hook>>,
}

impl SequentialRunner {
	pub fn new(hooks: Vec<Box<dyn Hook>>) -> Self {
		Self { hooks }
	}

	/// Run `pipeline`, saving each node's outputs to `catalog` as soon as the node completes. Nothing runs unless the pipeline is valid and all of its free inputs can be loaded. Returns the pipeline's outputs that are held only in memory.
	pub fn run(
		&self,
		pipeline: &Pipeline,
		catalog: &mut DataCatalog,
	) -> Result<BTreeMap<String, Artifact>, PipelineError> {
		pipeline.validate()?;
		let order = pipeline.topological_order()?;
		let missing_inputs: Vec<String> = pipeline
			.inputs()
			.into_iter()
			.filter(|input| !catalog.exists(input))
			.collect();
		if !missing_inputs.is_empty() {
			return Err(PipelineError::MissingInputs(missing_inputs));
		}

		for hook in self.hooks.iter() {
			hook.before_pipeline_run(pipeline);
		}
		let n_nodes = order.len();
		for (index, node) in order.into_iter().enumerate() {
			let inputs = node
				.inputs()
				.iter()
				.map(|name| Ok((name.clone(), catalog.load(name)?)))
				.collect::<Result<Vec<_>, PipelineError>>()?;
			let inputs = NodeInputs::new(node.name(), inputs);
			for hook in self.hooks.iter() {
				hook.before_node_run(node, &inputs);
			}
			let outputs = match node.run(&inputs) {
				Ok(outputs) => outputs,
				Err(error) => {
					for hook in self.hooks.iter() {
						hook.on_node_error(node, &error);
					}
					return Err(error);
				}
			};
			for hook in self.hooks.iter() {
				hook.after_node_run(node, &inputs, &outputs);
			}
			for (name, artifact) in node.outputs().iter().zip(outputs) {
				catalog.save(name, artifact)?;
			}
			tracing::info!("Completed {} out of {} tasks", index + 1, n_nodes);
		}
		for hook in self.hooks.iter() {
			hook.after_pipeline_run(pipeline);
		}
		tracing::info!("Pipeline execution completed successfully.");

		pipeline
			.outputs()
			.into_iter()
			.filter(|name| catalog.is_in_memory(name))
			.map(|name| {
				let artifact = catalog.load(&name)?;
				Ok((name, artifact))
			})
			.collect()
	}
}
