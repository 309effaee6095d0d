/*!
The data processing pipeline downloads the raw policies, derives the claim target, one hot encodes the categorical columns and splits the result into train and test sets.
*/

use crate::{model::TARGET_COLUMN_NAME, split::train_test_split};
use anyhow::{anyhow, bail, Context, Result};
use insurance_dataframe::{rdata, Column, DataFrame, FromCsvOptions, NumberColumn};
use insurance_features::one_hot::one_hot_encode;
use insurance_pipeline::{create_parent_dir, Artifact, Node, Pipeline};
use std::path::{Path, PathBuf};

/// The number of third party property damage claims. A policy with any such claim is a positive example.
pub const CLAIM_COUNT_COLUMN_NAME: &str = "Numtppd";

/// The claim columns are removed because they reveal the target.
pub const CLAIM_COLUMN_NAMES: [&str; 4] = ["Numtppd", "Numtpbi", "Indtppd", "Indtpbi"];

pub fn create_pipeline() -> Pipeline {
	Pipeline::new(vec![
		Node::new(
			"download_data_node",
			&[
				"params:data_url",
				"params:output_directory",
				"params:file_name",
			],
			&["raw_data_path"],
			|inputs| {
				let url: String = inputs.param(0)?;
				let output_directory: PathBuf = inputs.param(1)?;
				let file_name: String = inputs.param(2)?;
				let path = download_data(&url, &output_directory, &file_name)?;
				Ok(vec![Artifact::new(path.to_string_lossy().into_owned())])
			},
		),
		Node::new("load_data_node", &["raw_data_path"], &["raw_data"], |inputs| {
			let path: &String = inputs.get(0)?;
			Ok(vec![Artifact::new(load_data(Path::new(path))?)])
		}),
		Node::new(
			"preprocess_data_node",
			&["raw_data", "params:categorical_columns"],
			&["preprocessed_data"],
			|inputs| {
				let data: &DataFrame = inputs.get(0)?;
				let categorical_columns: Vec<String> = inputs.param(1)?;
				let preprocessed_data = preprocess_data(data.clone(), &categorical_columns)?;
				Ok(vec![Artifact::new(preprocessed_data)])
			},
		),
		Node::new(
			"split_data_node",
			&[
				"preprocessed_data",
				"params:test_size",
				"params:random_state",
			],
			&["X_train", "X_test", "y_train", "y_test"],
			|inputs| {
				let data: &DataFrame = inputs.get(0)?;
				let test_size: f64 = inputs.param(1)?;
				let random_state: u64 = inputs.param(2)?;
				let SplitData {
					x_train,
					x_test,
					y_train,
					y_test,
				} = split_data(data, test_size, random_state)?;
				Ok(vec![
					Artifact::new(x_train),
					Artifact::new(x_test),
					Artifact::new(y_train),
					Artifact::new(y_test),
				])
			},
		),
	])
}

/// Download the dataset at `url` and write it to `output_directory/file_name` as csv. Returns the path written to.
pub fn download_data(url: &str, output_directory: &Path, file_name: &str) -> Result<PathBuf> {
	tracing::info!("Downloading {}", url);
	let response = reqwest::blocking::get(url)
		.and_then(|response| response.error_for_status())
		.with_context(|| format!("failed to download {}", url))?;
	let bytes = response
		.bytes()
		.with_context(|| format!("failed to read the response from {}", url))?;
	let output_path = output_directory.join(file_name);
	write_raw_data(&bytes, &output_path)?;
	Ok(output_path)
}

/// Write a downloaded payload to `output_path`. Compressed payloads are decompressed first. An R data file is converted to csv from the first data frame it holds, and anything else is assumed to be csv already.
pub fn write_raw_data(bytes: &[u8], output_path: &Path) -> Result<()> {
	let bytes = rdata::decompress(bytes)?;
	if rdata::is_rdata(&bytes) {
		let (name, dataframe) = rdata::read_data_frame(&bytes)?;
		tracing::info!(
			"Writing the data frame {:?} with {} rows to {}",
			name,
			dataframe.nrows(),
			output_path.display()
		);
		dataframe.to_path(output_path)
	} else {
		create_parent_dir(output_path)?;
		std::fs::write(output_path, &bytes)
			.with_context(|| format!("failed to write {}", output_path.display()))
	}
}

pub fn load_data(path: &Path) -> Result<DataFrame> {
	let data = DataFrame::from_path(path, FromCsvOptions::default())?;
	tracing::info!(
		"Loaded {} rows and {} columns from {}",
		data.nrows(),
		data.ncols(),
		path.display()
	);
	Ok(data)
}

/// Add the `target` column, remove the claim columns and one hot encode `categorical_columns`. It is an error if any of these columns is missing.
pub fn preprocess_data(mut data: DataFrame, categorical_columns: &[String]) -> Result<DataFrame> {
	let claim_counts = data
		.column(CLAIM_COUNT_COLUMN_NAME)
		.ok_or_else(|| anyhow!("the column {:?} was not found", CLAIM_COUNT_COLUMN_NAME))?;
	// A missing claim count is not zero, so it counts as a claim.
	let target = match claim_counts {
		Column::Number(column) => column
			.data
			.iter()
			.map(|value| if *value != 0.0 { 1.0 } else { 0.0 })
			.collect(),
		Column::Unknown(column) => vec![1.0; column.len],
		_ => bail!(
			"expected the column {:?} to contain numbers",
			CLAIM_COUNT_COLUMN_NAME
		),
	};
	data.columns.push(Column::Number(NumberColumn {
		name: TARGET_COLUMN_NAME.to_owned(),
		data: target,
	}));
	for column_name in CLAIM_COLUMN_NAMES {
		data.remove_column(column_name)
			.ok_or_else(|| anyhow!("the column {:?} to drop was not found", column_name))?;
	}
	one_hot_encode(data, categorical_columns)
}

/// The features and labels of each side of a split. The label dataframes have a single `target` column.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitData {
	pub x_train: DataFrame,
	pub x_test: DataFrame,
	pub y_train: DataFrame,
	pub y_test: DataFrame,
}

pub fn split_data(data: &DataFrame, test_size: f64, random_state: u64) -> Result<SplitData> {
	let split = train_test_split(data.nrows(), test_size, random_state)?;
	let mut features = data.clone();
	let target = features
		.remove_column(TARGET_COLUMN_NAME)
		.ok_or_else(|| anyhow!("the column {:?} was not found", TARGET_COLUMN_NAME))?;
	let labels = DataFrame {
		columns: vec![target],
	};
	tracing::info!(
		"Split {} rows into {} train and {} test rows",
		data.nrows(),
		split.train.len(),
		split.test.len()
	);
	Ok(SplitData {
		x_train: features.take(&split.train),
		x_test: features.take(&split.test),
		y_train: labels.take(&split.train),
		y_test: labels.take(&split.test),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use insurance_dataframe::EnumColumn;
	use std::num::NonZeroUsize;

	fn number_column(name: &str, data: &[f64]) -> Column {
		Column::Number(NumberColumn {
			name: name.to_owned(),
			data: data.to_vec(),
		})
	}

	fn enum_column(name: &str, options: &[&str], data: &[usize]) -> Column {
		Column::Enum(EnumColumn {
			name: name.to_owned(),
			options: options.iter().map(|option| (*option).to_owned()).collect(),
			data: data.iter().map(|value| NonZeroUsize::new(*value)).collect(),
		})
	}

	fn raw_data() -> DataFrame {
		DataFrame {
			columns: vec![
				number_column("Numtppd", &[0.0, 1.0, 2.0, 0.0]),
				number_column("Numtpbi", &[0.0, 0.0, 1.0, 1.0]),
				number_column("Indtppd", &[0.0, 1.0, 1.0, 0.0]),
				number_column("Indtpbi", &[0.0, 0.0, 1.0, 1.0]),
				number_column("Age", &[25.0, 30.0, 45.0, 50.0]),
				enum_column("Gender", &["M", "F"], &[1, 2, 1, 2]),
				number_column("CalYear", &[2020.0, 2020.0, 2021.0, 2021.0]),
			],
		}
	}

	#[test]
	fn test_preprocess_data() {
		let categorical_columns = vec!["Gender".to_owned(), "CalYear".to_owned()];
		let result = preprocess_data(raw_data(), &categorical_columns).unwrap();
		let column_names: Vec<&str> = result.column_names().collect();
		insta::assert_debug_snapshot!(column_names, @r###"
  [
      "Age",
      "target",
      "Gender_F",
      "Gender_M",
      "CalYear_2020",
      "CalYear_2021",
  ]
  "###);
		assert_eq!(
			result.column("target").unwrap().as_number().unwrap().data,
			vec![0.0, 1.0, 1.0, 0.0]
		);
		assert_eq!(
			result.column("Gender_M").unwrap().as_number().unwrap().data,
			vec![1.0, 0.0, 1.0, 0.0]
		);
	}

	#[test]
	fn test_missing_claim_count_is_a_claim() {
		let mut data = raw_data();
		data.columns[0] = number_column("Numtppd", &[0.0, f64::NAN, 0.0, 3.0]);
		let result = preprocess_data(data, &[]).unwrap();
		assert_eq!(
			result.column("target").unwrap().as_number().unwrap().data,
			vec![0.0, 1.0, 0.0, 1.0]
		);
	}

	#[test]
	fn test_preprocess_data_missing_columns() {
		let mut data = raw_data();
		data.remove_column("Indtpbi");
		let error = preprocess_data(data, &[]).unwrap_err();
		assert_eq!(error.to_string(), "the column \"Indtpbi\" to drop was not found");
		let error = preprocess_data(raw_data(), &["Region".to_owned()]).unwrap_err();
		assert_eq!(
			error.to_string(),
			"the column \"Region\" to one hot encode was not found"
		);
	}

	#[test]
	fn test_split_data() {
		let data = DataFrame {
			columns: vec![
				number_column("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0]),
				number_column("feature2", &[5.0, 4.0, 3.0, 2.0, 1.0]),
				number_column("target", &[0.0, 1.0, 0.0, 1.0, 0.0]),
			],
		};
		let split = split_data(&data, 0.4, 42).unwrap();
		assert_eq!(split.x_train.nrows(), 3);
		assert_eq!(split.x_test.nrows(), 2);
		assert_eq!(split.y_train.nrows(), 3);
		assert_eq!(split.y_test.nrows(), 2);
		for x in [&split.x_train, &split.x_test] {
			assert!(x.column("target").is_none());
			assert_eq!(x.ncols(), 2);
		}
		for y in [&split.y_train, &split.y_test] {
			assert_eq!(y.column_names().collect::<Vec<_>>(), vec!["target"]);
		}
		// feature1 is distinct in every row, so the rows on each side can be told apart.
		let mut rows: Vec<f64> = split
			.x_train
			.column("feature1")
			.unwrap()
			.as_number()
			.unwrap()
			.data
			.iter()
			.chain(&split.x_test.column("feature1").unwrap().as_number().unwrap().data)
			.copied()
			.collect();
		rows.sort_by(|a, b| a.total_cmp(b));
		assert_eq!(rows, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
		assert_eq!(split, split_data(&data, 0.4, 42).unwrap());
	}

	#[test]
	fn test_split_data_invalid_test_size() {
		let data = DataFrame {
			columns: vec![number_column("target", &[0.0, 1.0])],
		};
		assert!(split_data(&data, 1.5, 42).is_err());
	}

	#[test]
	fn test_write_raw_csv() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("01_raw").join("pg15training.csv");
		write_raw_data(b"Numtppd,Age\n0,25\n1,30\n", &path).unwrap();
		let data = load_data(&path).unwrap();
		assert_eq!(data.nrows(), 2);
		assert_eq!(data.column_names().collect::<Vec<_>>(), vec!["Numtppd", "Age"]);
	}

	#[test]
	fn test_pipeline() {
		let pipeline = create_pipeline();
		insta::assert_debug_snapshot!(pipeline.node_names(), @r###"
  [
      "download_data_node",
      "load_data_node",
      "preprocess_data_node",
      "split_data_node",
  ]
  "###);
		insta::assert_debug_snapshot!(pipeline.inputs(), @r###"
  [
      "params:data_url",
      "params:output_directory",
      "params:file_name",
      "params:categorical_columns",
      "params:test_size",
      "params:random_state",
  ]
  "###);
	}
}
