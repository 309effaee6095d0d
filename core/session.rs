use crate::{
	config::Config,
	hooks::NodeHooks,
	registry::{register_pipelines, DEFAULT_PIPELINE_NAME},
};
use anyhow::{anyhow, Result};
use insurance_pipeline::{Artifact, SequentialRunner};
use itertools::Itertools;
use std::{collections::BTreeMap, path::Path};

/// A `Session` runs the registered pipelines of the project at one path.
pub struct Session {
	config: Config,
}

impl Session {
	pub fn create(project_path: &Path) -> Result<Self> {
		let config = Config::load(project_path)?;
		Ok(Self { config })
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Run the pipeline named `pipeline_name`, or the default pipeline if it is `None`. Returns the outputs of the pipeline that are not persisted by the catalog.
	pub fn run(&self, pipeline_name: Option<&str>) -> Result<BTreeMap<String, Artifact>> {
		let pipeline_name = pipeline_name.unwrap_or(DEFAULT_PIPELINE_NAME);
		let pipelines = register_pipelines();
		let pipeline = pipelines.get(pipeline_name).ok_or_else(|| {
			anyhow!(
				"the pipeline {:?} was not found, the registered pipelines are {}",
				pipeline_name,
				pipelines.keys().join(", ")
			)
		})?;
		tracing::info!(
			"Running the pipeline {} from {}",
			pipeline_name,
			self.config.project_path.display()
		);
		let mut catalog = self.config.data_catalog();
		let runner = SequentialRunner::new(vec![Box::new(NodeHooks)]);
		let outputs = runner.run(pipeline, &mut catalog)?;
		Ok(outputs)
	}
}
