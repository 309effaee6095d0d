use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
	#[error("node \"{0}\" is defined more than once with different inputs or outputs")]
	DuplicateNode(String),
	#[error("output \"{output}\" is produced by both node \"{first}\" and node \"{second}\"")]
	DuplicateOutput {
		output: String,
		first: String,
		second: String,
	},
	#[error("the pipeline contains a cycle through the nodes {}", .0.join(", "))]
	Cycle(Vec<String>),
	#[error("pipeline input(s) {} are not available in the catalog", .0.join(", "))]
	MissingInputs(Vec<String>),
	#[error("the pipeline has no node named \"{0}\"")]
	UnknownNode(String),
	#[error("node \"{node}\" declares {expected} output(s) but returned {actual}")]
	OutputCountMismatch {
		node: String,
		expected: usize,
		actual: usize,
	},
	#[error("node \"{node}\" has no input at position {index}")]
	InputIndex { node: String, index: usize },
	#[error("\"{name}\" is a {actual}, not a {expected}")]
	TypeMismatch {
		name: String,
		expected: &'static str,
		actual: &'static str,
	},
	#[error("parameter \"{name}\" could not be read")]
	InvalidParameter {
		name: String,
		source: serde_json::Error,
	},
	#[error("parameter \"{0}\" is not defined in the configuration")]
	MissingParameter(String),
	#[error("\"{0}\" has already been saved in this run")]
	AlreadySaved(String),
	#[error("\"{0}\" has not been saved and is not persisted by any dataset")]
	NotFound(String),
	#[error("failed to {operation} \"{name}\" with {dataset}")]
	Dataset {
		operation: &'static str,
		name: String,
		dataset: String,
		source: anyhow::Error,
	},
	#[error("node \"{node}\" failed")]
	NodeFailed { node: String, source: anyhow::Error },
}
