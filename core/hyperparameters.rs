use anyhow::{bail, Result};
use insurance_tree::TrainOptions;
use serde::{Deserialize, Serialize};

/**
The hyperparameters of the gradient boosted tree classifier, named the way LightGBM's scikit-learn interface names them. They are stored as a flat JSON object. Every field has a default, so any subset of the fields can be used to train a model.

| field               | default    | train option                |
|---------------------|------------|-----------------------------|
| `n_estimators`      | `100`      | `max_rounds`                |
| `learning_rate`     | `0.1`      | `learning_rate`             |
| `max_depth`         | `-1`       | `max_depth`, `-1` = no limit |
| `num_leaves`        | `31`       | `max_leaf_nodes`            |
| `min_child_samples` | `20`       | `min_examples_per_child`    |
| `subsample`         | `1.0`      | `row_subsample_fraction`    |
| `colsample_bytree`  | `1.0`      | `column_subsample_fraction` |
| `objective`         | `"binary"` |                             |
| `n_jobs`            | `-1`       | threads, `-1` = all         |
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
	pub n_estimators: usize,
	pub learning_rate: f32,
	pub max_depth: i64,
	pub num_leaves: usize,
	pub min_child_samples: usize,
	pub subsample: f32,
	pub colsample_bytree: f32,
	pub objective: String,
	pub n_jobs: i64,
}

impl Default for Hyperparameters {
	fn default() -> Self {
		Self {
			n_estimators: 100,
			learning_rate: 0.1,
			max_depth: -1,
			num_leaves: 31,
			min_child_samples: 20,
			subsample: 1.0,
			colsample_bytree: 1.0,
			objective: "binary".to_owned(),
			n_jobs: -1,
		}
	}
}

impl Hyperparameters {
	/// Check the values and convert them to the options for `BinaryClassifier::train`.
	pub fn train_options(&self) -> Result<TrainOptions> {
		if self.objective != "binary" {
			bail!(
				"the objective {:?} is not supported, the only supported objective is \"binary\"",
				self.objective
			);
		}
		if self.n_estimators == 0 {
			bail!("n_estimators must be at least 1");
		}
		if !(self.learning_rate > 0.0) {
			bail!("learning_rate must be positive, but it is {}", self.learning_rate);
		}
		if self.num_leaves < 2 {
			bail!("num_leaves must be at least 2, but it is {}", self.num_leaves);
		}
		for (name, value) in [
			("subsample", self.subsample),
			("colsample_bytree", self.colsample_bytree),
		] {
			if !(value > 0.0 && value <= 1.0) {
				bail!("{} must be in (0, 1], but it is {}", name, value);
			}
		}
		let max_depth = if self.max_depth > 0 {
			Some(self.max_depth as usize)
		} else {
			None
		};
		Ok(TrainOptions {
			learning_rate: self.learning_rate,
			max_depth,
			max_leaf_nodes: self.num_leaves,
			max_rounds: self.n_estimators,
			min_examples_per_child: self.min_child_samples,
			row_subsample_fraction: self.subsample,
			column_subsample_fraction: self.colsample_bytree,
			..Default::default()
		})
	}

	/// The number of threads to train with, or `None` to use the global thread pool.
	pub fn n_threads(&self) -> Option<usize> {
		if self.n_jobs > 0 {
			Some(self.n_jobs as usize)
		} else {
			None
		}
	}
}
