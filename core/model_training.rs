/*!
The model training pipeline searches for the best hyperparameters on the training set and then trains the final model with them on all of the training rows.
*/

use crate::{
	hyperparameters::Hyperparameters,
	model::{labels, Model},
	tuning::{SearchSpace, Study},
};
use anyhow::{anyhow, Result};
use insurance_dataframe::DataFrame;
use insurance_pipeline::{Artifact, Node, Pipeline};

pub fn create_pipeline() -> Pipeline {
	Pipeline::new(vec![
		Node::new(
			"tune_model_hyperparameters_node",
			&[
				"X_train",
				"y_train",
				"params:n_trials",
				"params:random_state",
			],
			&["best_hyperparameters"],
			|inputs| {
				let x_train: &DataFrame = inputs.get(0)?;
				let y_train: &DataFrame = inputs.get(1)?;
				let n_trials: usize = inputs.param(2)?;
				let random_state: u64 = inputs.param(3)?;
				let best_hyperparameters =
					tune_model_hyperparameters(x_train, y_train, n_trials, random_state)?;
				Ok(vec![Artifact::new(serde_json::Value::Object(
					best_hyperparameters,
				))])
			},
		),
		Node::new(
			"train_model_node",
			&["X_train", "y_train", "best_hyperparameters"],
			&["trained_model"],
			|inputs| {
				let x_train: &DataFrame = inputs.get(0)?;
				let y_train: &DataFrame = inputs.get(1)?;
				let hyperparameters: Hyperparameters = inputs.param(2)?;
				let model = train_model(x_train, y_train, &hyperparameters)?;
				Ok(vec![Artifact::new(model)])
			},
		),
	])
}

/// Run a random search with `n_trials` trials and return the best sampled hyperparameters, along with `objective` and `n_jobs`, which are not searched.
pub fn tune_model_hyperparameters(
	x_train: &DataFrame,
	y_train: &DataFrame,
	n_trials: usize,
	random_state: u64,
) -> Result<serde_json::Map<String, serde_json::Value>> {
	let labels = labels(y_train)?;
	let study = Study::optimize(
		x_train,
		&labels,
		&SearchSpace::default(),
		n_trials,
		random_state,
	)?;
	let best_trial = study
		.best_trial()
		.ok_or_else(|| anyhow!("the study has no trials"))?;
	let mut best_hyperparameters = best_trial.params.clone();
	best_hyperparameters.insert("objective".to_owned(), "binary".into());
	best_hyperparameters.insert("n_jobs".to_owned(), (-1i64).into());
	Ok(best_hyperparameters)
}

pub fn train_model(
	x_train: &DataFrame,
	y_train: &DataFrame,
	hyperparameters: &Hyperparameters,
) -> Result<Model> {
	let labels = labels(y_train)?;
	let model = Model::train(x_train, &labels, hyperparameters)?;
	tracing::info!(
		"Trained a model with {} trees on {} rows",
		model.classifier.trees.len(),
		labels.len()
	);
	for (name, importance) in model.feature_importances().iter().take(5) {
		tracing::debug!("Feature importance of {}: {:.4}", name, importance);
	}
	Ok(model)
}
