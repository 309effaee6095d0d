use crate::{data_processing, model_evaluation, model_training};
use insurance_pipeline::Pipeline;
use std::collections::BTreeMap;

/// The pipeline that runs when no pipeline name is given.
pub const DEFAULT_PIPELINE_NAME: &str = "__default__";

/// Register the project's pipelines by name.
pub fn register_pipelines() -> BTreeMap<String, Pipeline> {
	let data_processing_pipeline = data_processing::create_pipeline();
	let model_training_pipeline = model_training::create_pipeline();
	let model_evaluation_pipeline = model_evaluation::create_pipeline();
	let default_pipeline = data_processing_pipeline.clone()
		+ model_training_pipeline.clone()
		+ model_evaluation_pipeline.clone();
	let mut pipelines = BTreeMap::new();
	pipelines.insert("dp".to_owned(), data_processing_pipeline);
	pipelines.insert("mt".to_owned(), model_training_pipeline);
	pipelines.insert("me".to_owned(), model_evaluation_pipeline);
	pipelines.insert(DEFAULT_PIPELINE_NAME.to_owned(), default_pipeline);
	pipelines
}
