use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of examples where the predicted label equals the true label. The input is a `(predicted, label)` pair.
#[derive(Debug, Default)]
pub struct Accuracy(Mean);

impl Accuracy {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Accuracy {
	type Input = (bool, bool);
	type Output = Option<f32>;

	fn update(&mut self, value: Self::Input) {
		self.0.update(if value.0 == value.1 { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f32> {
		self.0.finalize()
	}
}

#[test]
fn test_accuracy() {
	let mut accuracy = Accuracy::new();
	let predictions = [true, false, true, true];
	let labels = [true, false, false, true];
	for (prediction, label) in predictions.iter().zip(labels.iter()) {
		accuracy.update((*prediction, *label));
	}
	assert_eq!(accuracy.finalize(), Some(0.75));
}
