use super::{TrainOptions, Tree};
use anyhow::{bail, Result};
use ndarray::{parallel::prelude::*, prelude::*};
use serde::{Deserialize, Serialize};

/// A binary classifier model is trained to predict binary target values, for example whether a policy will have a claim or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinaryClassifier {
	/// The initial prediction of the model given no trained trees. The bias is the log odds of the positive class in the training labels.
	pub bias: f32,
	/// The trees for this model.
	pub trees: Vec<Tree>,
	/// The importance of each feature as measured by the number of times the feature was used in a branch node, normalized to sum to one.
	pub feature_importances: Vec<f32>,
	/// The training losses in each round of training this model, if `compute_loss` was set.
	pub losses: Option<Vec<f32>>,
}

impl BinaryClassifier {
	/// Train a binary classifier. `features` has one row per example. Missing feature values are `NaN`.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<bool>,
		options: &TrainOptions,
	) -> Result<Self> {
		if features.nrows() != labels.len() {
			bail!(
				"there are {} rows of features but {} labels",
				features.nrows(),
				labels.len()
			);
		}
		if labels.is_empty() {
			bail!("cannot train a binary classifier without any examples");
		}
		Ok(crate::train::train(features, labels, options))
	}

	/// Compute the probability of the positive class for each example.
	pub fn predict_probabilities(&self, features: ArrayView2<f32>) -> Array1<f32> {
		let probabilities: Vec<f32> = features
			.axis_iter(Axis(0))
			.into_par_iter()
			.map(|row| {
				let row = row.to_vec();
				let logit = self.bias + self.trees.iter().map(|tree| tree.predict(&row)).sum::<f32>();
				sigmoid(logit)
			})
			.collect();
		Array1::from(probabilities)
	}

	/// Predict the class of each example. An example is predicted positive if its probability is greater than 0.5.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<bool> {
		self.predict_probabilities(features)
			.mapv(|probability| probability > 0.5)
	}
}

/// Compute the bias, which is the log odds of the positive class. It is clamped so a training set with a single class still yields a finite bias.
pub fn compute_bias(labels: &[bool]) -> f32 {
	let n_positive = labels.iter().filter(|label| **label).count() as f64;
	let n = labels.len() as f64;
	let fraction = (n_positive / n).clamp(1e-15, 1.0 - 1e-15);
	(fraction / (1.0 - fraction)).ln() as f32
}

/// Compute the gradients and hessians of the binary cross entropy loss for each example given the labels and current logits.
pub fn update_gradients_and_hessians(
	gradients: &mut [f32],
	hessians: &mut [f32],
	labels: &[bool],
	logits: &[f32],
) {
	gradients
		.par_iter_mut()
		.zip(hessians.par_iter_mut())
		.zip(labels.par_iter().zip(logits.par_iter()))
		.for_each(|((gradient, hessian), (label, logit))| {
			let probability = sigmoid(*logit).clamp(f32::EPSILON, 1.0 - f32::EPSILON);
			*gradient = probability - if *label { 1.0 } else { 0.0 };
			*hessian = probability * (1.0 - probability);
		});
}

/// Compute the binary cross entropy loss.
pub fn compute_loss(labels: &[bool], logits: &[f32]) -> f32 {
	let mut total = 0.0;
	for (label, logit) in labels.iter().zip(logits) {
		let probability = sigmoid(*logit).clamp(f32::EPSILON, 1.0 - f32::EPSILON);
		total += if *label {
			-probability.ln()
		} else {
			-(1.0 - probability).ln()
		};
	}
	total / labels.len() as f32
}

fn sigmoid(value: f32) -> f32 {
	1.0 / ((-value).exp() + 1.0)
}
