use crate::hyperparameters::Hyperparameters;
use anyhow::{anyhow, Context, Result};
use insurance_dataframe::{Column, DataFrame};
use insurance_features::{compute_feature_groups, compute_features_array_f32, FeatureGroup};
use insurance_tree::BinaryClassifier;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// The name of the label column in the `y_*` dataframes.
pub const TARGET_COLUMN_NAME: &str = "target";

/// A trained model holds everything needed to make predictions for a features dataframe with the same columns it was trained on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
	pub feature_groups: Vec<FeatureGroup>,
	pub hyperparameters: Hyperparameters,
	pub classifier: BinaryClassifier,
}

impl Model {
	/// Train a model on every row of `features`. If `hyperparameters.n_jobs` is positive, training runs on a thread pool with that many threads.
	pub fn train(
		features: &DataFrame,
		labels: &[bool],
		hyperparameters: &Hyperparameters,
	) -> Result<Self> {
		let options = hyperparameters.train_options()?;
		let feature_groups = compute_feature_groups(features)?;
		let features_array = compute_features_array_f32(features, &feature_groups)?;
		let labels = ArrayView1::from(labels);
		let train = || BinaryClassifier::train(features_array.view(), labels, &options);
		let classifier = match hyperparameters.n_threads() {
			Some(n_threads) => rayon::ThreadPoolBuilder::new()
				.num_threads(n_threads)
				.build()
				.context("failed to build the training thread pool")?
				.install(train)?,
			None => train()?,
		};
		Ok(Self {
			feature_groups,
			hyperparameters: hyperparameters.clone(),
			classifier,
		})
	}

	/// The importance of each feature column, most important first.
	pub fn feature_importances(&self) -> Vec<(String, f32)> {
		let mut importances: Vec<(String, f32)> = self
			.feature_groups
			.iter()
			.flat_map(|group| group.feature_names())
			.zip(self.classifier.feature_importances.iter().copied())
			.collect();
		importances.sort_by(|a, b| b.1.total_cmp(&a.1));
		importances
	}

	pub fn predict_probabilities(&self, features: &DataFrame) -> Result<Array1<f32>> {
		let features = compute_features_array_f32(features, &self.feature_groups)?;
		Ok(self.classifier.predict_probabilities(features.view()))
	}

	pub fn predict(&self, features: &DataFrame) -> Result<Array1<bool>> {
		let features = compute_features_array_f32(features, &self.feature_groups)?;
		Ok(self.classifier.predict(features.view()))
	}
}

/// Read the labels from the `target` column of `labels`. Any nonzero value is the positive class.
pub fn labels(labels: &DataFrame) -> Result<Vec<bool>> {
	let column = labels
		.column(TARGET_COLUMN_NAME)
		.ok_or_else(|| anyhow!("the labels have no {:?} column", TARGET_COLUMN_NAME))?;
	match column {
		Column::Number(column) => Ok(column.data.iter().map(|value| *value != 0.0).collect()),
		_ => Err(anyhow!(
			"expected the {:?} column to contain numbers",
			TARGET_COLUMN_NAME
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use insurance_dataframe::NumberColumn;

	fn number_column(name: &str, data: &[f64]) -> Column {
		Column::Number(NumberColumn {
			name: name.to_owned(),
			data: data.to_vec(),
		})
	}

	fn features() -> DataFrame {
		DataFrame {
			columns: vec![
				number_column("Age", &[20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0]),
				number_column("Gender_M", &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
			],
		}
	}

	#[test]
	fn test_train_and_predict() {
		let labels = [false, false, false, false, true, true, true, true];
		let hyperparameters = Hyperparameters {
			n_estimators: 20,
			min_child_samples: 1,
			n_jobs: 2,
			..Default::default()
		};
		let model = Model::train(&features(), &labels, &hyperparameters).unwrap();
		assert_eq!(model.feature_groups.len(), 2);
		assert_eq!(model.classifier.trees.len(), 20);
		let predictions = model.predict(&features()).unwrap();
		assert_eq!(predictions.to_vec(), labels.to_vec());
		let probabilities = model.predict_probabilities(&features()).unwrap();
		assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
		let importances = model.feature_importances();
		assert_eq!(importances.len(), 2);
		assert_eq!(importances[0].0, "Age");
		assert!(importances[0].1 >= importances[1].1);
	}

	#[test]
	fn test_msgpack_round_trip() {
		let labels = [false, true, false, true, false, true, false, true];
		let model = Model::train(&features(), &labels, &Hyperparameters::default()).unwrap();
		let bytes = rmp_serde::to_vec_named(&model).unwrap();
		let loaded: Model = rmp_serde::from_slice(&bytes).unwrap();
		assert_eq!(loaded, model);
	}

	#[test]
	fn test_labels() {
		let y = DataFrame {
			columns: vec![number_column("target", &[0.0, 1.0, 2.0, 0.0])],
		};
		assert_eq!(labels(&y).unwrap(), vec![false, true, true, false]);
		let y = DataFrame {
			columns: vec![number_column("label", &[0.0])],
		};
		assert!(labels(&y).is_err());
	}
}
