use super::{Metric, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// `BinaryClassificationMetrics` computes a confusion matrix for predicted labels, along with the metrics derived from it.
#[derive(Debug)]
pub struct BinaryClassificationMetrics {
	/// The confusion matrix is indexed by `[label, predicted]`, where index 1 is the positive class.
	confusion_matrix: Array2<u64>,
}

/// The input to [`BinaryClassificationMetrics`].
pub struct BinaryClassificationMetricsInput<'a> {
	pub predictions: ArrayView1<'a, bool>,
	pub labels: ArrayView1<'a, bool>,
}

/// Precision, recall and f1 score are 0.0 when their denominator is zero.
#[derive(Debug)]
pub struct BinaryClassificationMetricsOutput {
	/// Rows are the true label and columns the predicted label, negative first: `[[tn, fp], [fn, tp]]`.
	pub confusion_matrix: [[u64; 2]; 2],
	pub true_positives: u64,
	pub false_positives: u64,
	pub true_negatives: u64,
	pub false_negatives: u64,
	pub accuracy: f32,
	pub precision: f32,
	pub recall: f32,
	pub f1_score: f32,
}

impl BinaryClassificationMetrics {
	pub fn new() -> Self {
		Self {
			confusion_matrix: Array2::zeros((2, 2)),
		}
	}
}

impl Default for BinaryClassificationMetrics {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> StreamingMetric<'a> for BinaryClassificationMetrics {
	type Input = BinaryClassificationMetricsInput<'a>;
	type Output = BinaryClassificationMetricsOutput;

	fn update(&mut self, input: Self::Input) {
		for (prediction, label) in input.predictions.iter().zip(input.labels.iter()) {
			self.confusion_matrix[(*label as usize, *prediction as usize)] += 1;
		}
	}

	fn merge(&mut self, other: Self) {
		self.confusion_matrix += &other.confusion_matrix;
	}

	fn finalize(self) -> Self::Output {
		let true_negatives = self.confusion_matrix[(0, 0)];
		let false_positives = self.confusion_matrix[(0, 1)];
		let false_negatives = self.confusion_matrix[(1, 0)];
		let true_positives = self.confusion_matrix[(1, 1)];
		let n_examples = true_negatives + false_positives + false_negatives + true_positives;
		let accuracy = ratio(true_positives + true_negatives, n_examples).unwrap_or_else(|| {
			tracing::warn!("accuracy is ill-defined with no examples, setting it to 0");
			0.0
		});
		let precision = ratio(true_positives, true_positives + false_positives).unwrap_or_else(|| {
			tracing::warn!("precision is ill-defined with no predicted positives, setting it to 0");
			0.0
		});
		let recall = ratio(true_positives, true_positives + false_negatives).unwrap_or_else(|| {
			tracing::warn!("recall is ill-defined with no true positives in the labels, setting it to 0");
			0.0
		});
		let f1_score = if precision + recall > 0.0 {
			2.0 * (precision * recall) / (precision + recall)
		} else {
			tracing::warn!("f1 score is ill-defined when precision and recall are both 0, setting it to 0");
			0.0
		};
		BinaryClassificationMetricsOutput {
			confusion_matrix: [
				[true_negatives, false_positives],
				[false_negatives, true_positives],
			],
			true_positives,
			false_positives,
			true_negatives,
			false_negatives,
			accuracy,
			precision,
			recall,
			f1_score,
		}
	}
}

impl<'a> Metric<'a> for BinaryClassificationMetrics {
	type Input = BinaryClassificationMetricsInput<'a>;
	type Output = BinaryClassificationMetricsOutput;

	fn compute(input: Self::Input) -> Self::Output {
		let mut metrics = BinaryClassificationMetrics::new();
		metrics.update(input);
		metrics.finalize()
	}
}

fn ratio(numerator: u64, denominator: u64) -> Option<f32> {
	if denominator == 0 {
		None
	} else {
		Some(numerator.to_f32()? / denominator.to_f32()?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_binary_classification_metrics() {
		let labels = arr1(&[false, false, false, false, true, true, true, true]);
		let predictions = arr1(&[false, false, false, true, true, true, true, false]);
		let metrics = BinaryClassificationMetrics::compute(BinaryClassificationMetricsInput {
			predictions: predictions.view(),
			labels: labels.view(),
		});
		insta::assert_debug_snapshot!(metrics, @r###"
  BinaryClassificationMetricsOutput {
      confusion_matrix: [
          [
              3,
              1,
          ],
          [
              1,
              3,
          ],
      ],
      true_positives: 3,
      false_positives: 1,
      true_negatives: 3,
      false_negatives: 1,
      accuracy: 0.75,
      precision: 0.75,
      recall: 0.75,
      f1_score: 0.75,
  }
  "###);
	}

	#[test]
	fn test_no_predicted_positives() {
		let labels = arr1(&[false, true, true]);
		let predictions = arr1(&[false, false, false]);
		let mut metrics = BinaryClassificationMetrics::new();
		metrics.update(BinaryClassificationMetricsInput {
			predictions: predictions.slice(s![..1]),
			labels: labels.slice(s![..1]),
		});
		let mut rest = BinaryClassificationMetrics::new();
		rest.update(BinaryClassificationMetricsInput {
			predictions: predictions.slice(s![1..]),
			labels: labels.slice(s![1..]),
		});
		metrics.merge(rest);
		let metrics = metrics.finalize();
		assert_eq!(metrics.confusion_matrix, [[1, 0], [2, 0]]);
		assert!((metrics.accuracy - 1.0 / 3.0).abs() < 1e-6);
		assert_eq!(metrics.precision, 0.0);
		assert_eq!(metrics.recall, 0.0);
		assert_eq!(metrics.f1_score, 0.0);
	}
}
