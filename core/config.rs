/*!
This module loads the project configuration from `conf/`. Both `parameters.yml` and `catalog.yml` are read from `conf/base` and then from `conf/local` if it exists, with top level keys in `conf/local` replacing the same keys from `conf/base`.

Relative catalog file paths and the directory parameters in [`PATH_PARAMETERS`] are resolved against the project directory, so a run behaves the same from any working directory.

```yaml
# conf/base/catalog.yml
X_train:
  type: csv
  filepath: data/03_primary/X_train.csv
trained_model:
  type: msgpack
  filepath: data/06_models/trained_model.msgpack
```
*/

use crate::{csv_dataset::CsvDataset, model::Model};
use anyhow::{Context, Result};
use insurance_pipeline::{DataCatalog, Dataset, JsonDataset, MsgPackDataset, TextDataset};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

pub const CONF_DIR: &str = "conf";
pub const BASE_ENV: &str = "base";
pub const LOCAL_ENV: &str = "local";
pub const PARAMETERS_FILE_NAME: &str = "parameters.yml";
pub const CATALOG_FILE_NAME: &str = "catalog.yml";
/// Parameters holding a path that nodes write to.
pub const PATH_PARAMETERS: &[&str] = &["output_directory"];

/// How to persist one catalog entry. Relative file paths are resolved against the project directory.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "type")]
pub enum DatasetConfig {
	#[serde(rename = "text")]
	Text { filepath: PathBuf },
	#[serde(rename = "csv")]
	Csv { filepath: PathBuf },
	#[serde(rename = "json")]
	Json { filepath: PathBuf },
	#[serde(rename = "msgpack")]
	MsgPack { filepath: PathBuf },
}

impl DatasetConfig {
	pub fn filepath(&self) -> &Path {
		match self {
			DatasetConfig::Text { filepath } => filepath,
			DatasetConfig::Csv { filepath } => filepath,
			DatasetConfig::Json { filepath } => filepath,
			DatasetConfig::MsgPack { filepath } => filepath,
		}
	}

	fn build(&self, project_path: &Path) -> Box<dyn Dataset> {
		let path = project_path.join(self.filepath());
		match self {
			DatasetConfig::Text { .. } => Box::new(TextDataset::new(path)),
			DatasetConfig::Csv { .. } => Box::new(CsvDataset::new(path)),
			DatasetConfig::Json { .. } => Box::new(JsonDataset::<serde_json::Value>::new(path)),
			DatasetConfig::MsgPack { .. } => Box::new(MsgPackDataset::<Model>::new(path)),
		}
	}
}

/// The configuration of a project directory.
#[derive(Clone, Debug)]
pub struct Config {
	pub project_path: PathBuf,
	pub parameters: serde_json::Map<String, serde_json::Value>,
	pub catalog: BTreeMap<String, DatasetConfig>,
}

impl Config {
	pub fn load(project_path: &Path) -> Result<Self> {
		let project_path = if project_path.is_absolute() {
			project_path.to_owned()
		} else {
			std::env::current_dir()
				.context("failed to get the current directory")?
				.join(project_path)
		};
		let project_path = project_path.as_path();
		let mut parameters = load_layered(project_path, PARAMETERS_FILE_NAME)?;
		for name in PATH_PARAMETERS {
			if let Some(serde_json::Value::String(path)) = parameters.get_mut(*name) {
				*path = project_path.join(&*path).display().to_string();
			}
		}
		let catalog = load_layered(project_path, CATALOG_FILE_NAME)?
			.into_iter()
			.map(|(name, value)| {
				let dataset_config = serde_json::from_value(value)
					.with_context(|| format!("invalid catalog entry {:?}", name))?;
				Ok((name, dataset_config))
			})
			.collect::<Result<_>>()?;
		Ok(Self {
			project_path: project_path.to_owned(),
			parameters,
			catalog,
		})
	}

	/// Create a catalog holding the parameters, with a dataset registered for every catalog entry.
	pub fn data_catalog(&self) -> DataCatalog {
		let mut catalog = DataCatalog::new(self.parameters.clone());
		for (name, dataset_config) in self.catalog.iter() {
			catalog.add_dataset(name, dataset_config.build(&self.project_path));
		}
		catalog
	}
}

fn load_layered(
	project_path: &Path,
	file_name: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
	let conf_path = project_path.join(CONF_DIR);
	let mut values = load_yaml_mapping(&conf_path.join(BASE_ENV).join(file_name))?;
	let local_path = conf_path.join(LOCAL_ENV).join(file_name);
	if local_path.is_file() {
		values.extend(load_yaml_mapping(&local_path)?);
	}
	Ok(values)
}

fn load_yaml_mapping(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
	let text = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read config file {}", path.display()))?;
	if text.trim().is_empty() {
		return Ok(serde_json::Map::new());
	}
	let value: Option<serde_json::Map<String, serde_json::Value>> = serde_yaml::from_str(&text)
		.with_context(|| format!("failed to parse config file {}", path.display()))?;
	Ok(value.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write(path: &Path, text: &str) {
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		std::fs::write(path, text).unwrap();
	}

	#[test]
	fn test_local_overrides_base() {
		let dir = tempfile::tempdir().unwrap();
		write(
			&dir.path().join("conf/base/parameters.yml"),
			"test_size: 0.2\nrandom_state: 42\ncategorical_columns: [Gender, Type]\n",
		);
		write(
			&dir.path().join("conf/local/parameters.yml"),
			"random_state: 7\n",
		);
		write(&dir.path().join("conf/base/catalog.yml"), "");
		let config = Config::load(dir.path()).unwrap();
		insta::assert_snapshot!(serde_json::to_string(&config.parameters).unwrap(), @r###"{"categorical_columns":["Gender","Type"],"random_state":7,"test_size":0.2}"###);
		assert!(config.catalog.is_empty());
	}

	#[test]
	fn test_output_directory_is_resolved_against_project() {
		let dir = tempfile::tempdir().unwrap();
		let absolute = dir.path().join("elsewhere");
		write(
			&dir.path().join("conf/base/parameters.yml"),
			"output_directory: data/01_raw
",
		);
		write(&dir.path().join("conf/base/catalog.yml"), "");
		let config = Config::load(dir.path()).unwrap();
		assert_eq!(
			config.parameters["output_directory"],
			dir.path().join("data/01_raw").display().to_string()
		);
		write(
			&dir.path().join("conf/local/parameters.yml"),
			&format!("output_directory: {}\n", absolute.display()),
		);
		let config = Config::load(dir.path()).unwrap();
		assert_eq!(
			config.parameters["output_directory"],
			absolute.display().to_string()
		);
	}

	#[test]
	fn test_catalog() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir.path().join("conf/base/parameters.yml"), "n_trials: 3\n");
		write(
			&dir.path().join("conf/base/catalog.yml"),
			"raw_data_path:\n  type: text\n  filepath: data/01_raw/raw_data_path.txt\ntrained_model:\n  type: msgpack\n  filepath: data/06_models/trained_model.msgpack\n",
		);
		let config = Config::load(dir.path()).unwrap();
		assert_eq!(
			config.catalog["raw_data_path"],
			DatasetConfig::Text {
				filepath: PathBuf::from("data/01_raw/raw_data_path.txt")
			}
		);
		let catalog = config.data_catalog();
		assert_eq!(catalog.dataset_names(), vec!["raw_data_path", "trained_model"]);
		assert!(catalog.exists("params:n_trials"));
		assert!(!catalog.exists("trained_model"));
	}

	#[test]
	fn test_invalid_catalog_entry() {
		let dir = tempfile::tempdir().unwrap();
		write(&dir.path().join("conf/base/parameters.yml"), "");
		write(
			&dir.path().join("conf/base/catalog.yml"),
			"X_train:\n  type: parquet\n  filepath: data/03_primary/X_train.parquet\n",
		);
		let error = Config::load(dir.path()).unwrap_err();
		assert_eq!(error.to_string(), "invalid catalog entry \"X_train\"");
	}

	#[test]
	fn test_missing_base_config() {
		let dir = tempfile::tempdir().unwrap();
		assert!(Config::load(dir.path()).is_err());
	}
}
