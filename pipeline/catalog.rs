use crate::{Artifact, Dataset, PipelineError};
use std::collections::{BTreeMap, BTreeSet};

/// Inputs with this prefix are read from the parameters rather than from saved artifacts.
pub const PARAMS_PREFIX: &str = "params:";

/// The `DataCatalog` stores artifacts by name for a single run. Names with a registered dataset are also persisted, so a later run can load them without running the nodes that produced them. Every name may be saved at most once per run.
pub struct DataCatalog {
	parameters: serde_json::Map<String, serde_json::Value>,
	datasets: BTreeMap<String, Box<dyn Dataset>>,
	artifacts: BTreeMap<String, Artifact>,
	saved: BTreeSet<String>,
}

impl DataCatalog {
	pub fn new(parameters: serde_json::Map<String, serde_json::Value>) -> Self {
		Self {
			parameters,
			datasets: BTreeMap::new(),
			artifacts: BTreeMap::new(),
			saved: BTreeSet::new(),
		}
	}

	/// Register a dataset to persist the artifact named `name`.
	pub fn add_dataset(&mut self, name: &str, dataset: Box<dyn Dataset>) {
		self.datasets.insert(name.to_owned(), dataset);
	}

	pub fn dataset_names(&self) -> Vec<&str> {
		self.datasets.keys().map(String::as_str).collect()
	}

	/// Whether `name` can be loaded.
	pub fn exists(&self, name: &str) -> bool {
		if let Some(key) = name.strip_prefix(PARAMS_PREFIX) {
			return self.parameter(key).is_some();
		}
		self.artifacts.contains_key(name)
			|| self
				.datasets
				.get(name)
				.map_or(false, |dataset| dataset.exists())
	}

	pub fn load(&self, name: &str) -> Result<Artifact, PipelineError> {
		if let Some(key) = name.strip_prefix(PARAMS_PREFIX) {
			let value = self
				.parameter(key)
				.ok_or_else(|| PipelineError::MissingParameter(key.to_owned()))?;
			return Ok(Artifact::new(value.clone()));
		}
		if let Some(artifact) = self.artifacts.get(name) {
			return Ok(artifact.clone());
		}
		match self.datasets.get(name) {
			Some(dataset) if dataset.exists() => {
				tracing::debug!("Loading {} from {}", name, dataset.describe());
				dataset.load().map_err(|source| PipelineError::Dataset {
					operation: "load",
					name: name.to_owned(),
					dataset: dataset.describe(),
					source,
				})
			}
			_ => Err(PipelineError::NotFound(name.to_owned())),
		}
	}

	pub fn save(&mut self, name: &str, artifact: Artifact) -> Result<(), PipelineError> {
		if !self.saved.insert(name.to_owned()) {
			return Err(PipelineError::AlreadySaved(name.to_owned()));
		}
		if let Some(dataset) = self.datasets.get(name) {
			tracing::debug!("Saving {} to {}", name, dataset.describe());
			dataset
				.save(&artifact)
				.map_err(|source| PipelineError::Dataset {
					operation: "save",
					name: name.to_owned(),
					dataset: dataset.describe(),
					source,
				})?;
		}
		self.artifacts.insert(name.to_owned(), artifact);
		Ok(())
	}

	/// Whether `name` is kept only in memory for this run.
	pub fn is_in_memory(&self, name: &str) -> bool {
		!name.starts_with(PARAMS_PREFIX) && !self.datasets.contains_key(name)
	}

	/// Look up a parameter. Dots in `key` step into nested mappings.
	fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
		if let Some(value) = self.parameters.get(key) {
			return Some(value);
		}
		let mut parts = key.split('.');
		let first = self.parameters.get(parts.next()?)?;
		parts.try_fold(first, |value, part| value.get(part))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::TextDataset;

	fn parameters() -> serde_json::Map<String, serde_json::Value> {
		serde_json::json!({
			"test_size": 0.2,
			"model": { "n_trials": 50 },
		})
		.as_object()
		.unwrap()
		.clone()
	}

	#[test]
	fn test_parameters() {
		let catalog = DataCatalog::new(parameters());
		assert!(catalog.exists("params:test_size"));
		assert!(catalog.exists("params:model.n_trials"));
		let n_trials = catalog.load("params:model.n_trials").unwrap();
		assert_eq!(
			n_trials.downcast_ref::<serde_json::Value>(),
			Some(&serde_json::json!(50))
		);
		assert!(matches!(
			catalog.load("params:data_url"),
			Err(PipelineError::MissingParameter(key)) if key == "data_url"
		));
	}

	#[test]
	fn test_save_once() {
		let mut catalog = DataCatalog::new(parameters());
		assert!(!catalog.exists("X_train"));
		assert!(matches!(
			catalog.load("X_train"),
			Err(PipelineError::NotFound(_))
		));
		catalog.save("X_train", Artifact::new(vec![1.0f32])).unwrap();
		assert!(catalog.exists("X_train"));
		assert!(matches!(
			catalog.save("X_train", Artifact::new(vec![2.0f32])),
			Err(PipelineError::AlreadySaved(_))
		));
		let loaded = catalog.load("X_train").unwrap();
		assert_eq!(loaded.downcast_ref::<Vec<f32>>(), Some(&vec![1.0]));
	}

	#[test]
	fn test_persisted_artifacts_are_available_to_a_later_run() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("raw_data_path.txt");
		let mut first_run = DataCatalog::new(parameters());
		first_run.add_dataset("raw_data_path", Box::new(TextDataset::new(&path)));
		first_run
			.save("raw_data_path", Artifact::new(String::from("data/01_raw/pg15training.csv")))
			.unwrap();
		let mut second_run = DataCatalog::new(parameters());
		second_run.add_dataset("raw_data_path", Box::new(TextDataset::new(&path)));
		assert!(second_run.exists("raw_data_path"));
		assert!(!second_run.is_in_memory("raw_data_path"));
		let loaded = second_run.load("raw_data_path").unwrap();
		assert_eq!(
			loaded.downcast_ref::<String>().unwrap(),
			"data/01_raw/pg15training.csv"
		);
	}
}
