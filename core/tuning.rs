/*!
This module implements the random search over the classifier's hyperparameters. A [`Study`] samples `n_trials` configurations from a [`SearchSpace`], trains a classifier with each on the same inner training split and scores it by accuracy on the inner validation split.
*/

use crate::{hyperparameters::Hyperparameters, split::train_test_split};
use anyhow::{bail, Result};
use insurance_dataframe::DataFrame;
use insurance_features::{compute_feature_groups, compute_features_array_f32};
use insurance_metrics::{Accuracy, StreamingMetric};
use insurance_tree::BinaryClassifier;
use ndarray::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// The fraction of the training data held out to validate each trial.
pub const VALIDATION_FRACTION: f64 = 0.2;

/// The domain a single hyperparameter is sampled from. Both bounds are inclusive.
#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
	Int { low: i64, high: i64 },
	Uniform { low: f64, high: f64 },
	/// Sampled uniformly in log space, for values that span orders of magnitude.
	LogUniform { low: f64, high: f64 },
}

impl Distribution {
	pub fn sample<R: Rng>(&self, rng: &mut R) -> serde_json::Value {
		match *self {
			Distribution::Int { low, high } => rng.gen_range(low..=high).into(),
			Distribution::Uniform { low, high } => rng.gen_range(low..=high).into(),
			Distribution::LogUniform { low, high } => rng
				.gen_range(low.ln()..=high.ln())
				.exp()
				.clamp(low, high)
				.into(),
		}
	}
}

/// The hyperparameters to search over, by name, in the order they are sampled.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSpace {
	pub parameters: Vec<(String, Distribution)>,
}

impl Default for SearchSpace {
	fn default() -> Self {
		let parameters = vec![
			("n_estimators", Distribution::Int { low: 10, high: 200 }),
			(
				"learning_rate",
				Distribution::LogUniform {
					low: 0.001,
					high: 0.3,
				},
			),
			("max_depth", Distribution::Int { low: 3, high: 10 }),
			("num_leaves", Distribution::Int { low: 20, high: 150 }),
			("min_child_samples", Distribution::Int { low: 5, high: 100 }),
			("subsample", Distribution::Uniform { low: 0.5, high: 1.0 }),
			(
				"colsample_bytree",
				Distribution::Uniform { low: 0.5, high: 1.0 },
			),
		];
		Self {
			parameters: parameters
				.into_iter()
				.map(|(name, distribution)| (name.to_owned(), distribution))
				.collect(),
		}
	}
}

impl SearchSpace {
	pub fn sample<R: Rng>(&self, rng: &mut R) -> serde_json::Map<String, serde_json::Value> {
		self.parameters
			.iter()
			.map(|(name, distribution)| (name.clone(), distribution.sample(rng)))
			.collect()
	}
}

/// One sampled configuration and its validation accuracy.
#[derive(Clone, Debug, PartialEq)]
pub struct Trial {
	pub number: usize,
	pub params: serde_json::Map<String, serde_json::Value>,
	pub accuracy: f32,
}

/// The history of a hyperparameter search.
#[derive(Clone, Debug, Default)]
pub struct Study {
	trials: Vec<Trial>,
}

impl Study {
	/// Run `n_trials` trials. Sampling and the inner split are both seeded from `seed`, so a study with the same inputs is reproducible.
	pub fn optimize(
		features: &DataFrame,
		labels: &[bool],
		search_space: &SearchSpace,
		n_trials: usize,
		seed: u64,
	) -> Result<Self> {
		if n_trials == 0 {
			bail!("n_trials must be at least 1");
		}
		if features.nrows() != labels.len() {
			bail!(
				"there are {} rows of features but {} labels",
				features.nrows(),
				labels.len()
			);
		}

		// The split does not change between trials, so the feature matrices are computed once.
		let split = train_test_split(labels.len(), VALIDATION_FRACTION, seed)?;
		let features_train = features.take(&split.train);
		let feature_groups = compute_feature_groups(&features_train)?;
		let features_train = compute_features_array_f32(&features_train, &feature_groups)?;
		let features_validation =
			compute_features_array_f32(&features.take(&split.test), &feature_groups)?;
		let labels_train: Array1<bool> = split.train.iter().map(|index| labels[*index]).collect();
		let labels_validation: Vec<bool> = split.test.iter().map(|index| labels[*index]).collect();
		tracing::debug!(
			n_train = split.train.len(),
			n_validation = split.test.len(),
			"split the training data for tuning"
		);

		let mut rng = Xoshiro256Plus::seed_from_u64(seed);
		let mut study = Study::default();
		for number in 0..n_trials {
			let params = search_space.sample(&mut rng);
			let hyperparameters: Hyperparameters =
				serde_json::from_value(serde_json::Value::Object(params.clone()))?;
			let options = hyperparameters.train_options()?;
			let classifier =
				BinaryClassifier::train(features_train.view(), labels_train.view(), &options)?;
			let predictions = classifier.predict(features_validation.view());
			let mut accuracy = Accuracy::new();
			for (prediction, label) in predictions.iter().zip(labels_validation.iter()) {
				accuracy.update((*prediction, *label));
			}
			let accuracy = accuracy.finalize().unwrap_or(0.0);
			tracing::debug!(number, accuracy, ?params, "finished trial");
			study.trials.push(Trial {
				number,
				params,
				accuracy,
			});
		}
		if let Some(best_trial) = study.best_trial() {
			tracing::info!(
				"Best trial is {} of {} with accuracy {}",
				best_trial.number,
				n_trials,
				best_trial.accuracy
			);
		}
		Ok(study)
	}

	pub fn trials(&self) -> &[Trial] {
		&self.trials
	}

	/// The trial with the highest accuracy. Ties go to the earliest trial.
	pub fn best_trial(&self) -> Option<&Trial> {
		self.trials.iter().fold(None, |best: Option<&Trial>, trial| match best {
			Some(best) if best.accuracy >= trial.accuracy => Some(best),
			_ => Some(trial),
		})
	}
}
