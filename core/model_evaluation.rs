/*!
The model evaluation pipeline scores the trained model on the test set and draws its confusion matrix.
*/

use crate::model::{labels, Model};
use anyhow::{bail, Result};
use insurance_dataframe::DataFrame;
use insurance_metrics::{
	BinaryClassificationMetrics, BinaryClassificationMetricsInput,
	BinaryClassificationMetricsOutput, Metric,
};
use insurance_pipeline::{create_parent_dir, Artifact, Node, Pipeline};
use ndarray::prelude::*;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub fn create_pipeline() -> Pipeline {
	Pipeline::new(vec![
		Node::new(
			"evaluate_model_node",
			&["trained_model", "X_test", "y_test"],
			&["model_metrics"],
			|inputs| {
				let model: &Model = inputs.get(0)?;
				let x_test: &DataFrame = inputs.get(1)?;
				let y_test: &DataFrame = inputs.get(2)?;
				let metrics = evaluate_model(model, x_test, y_test)?;
				Ok(vec![Artifact::new(serde_json::to_value(metrics)?)])
			},
		),
		Node::new(
			"plot_confusion_matrix_node",
			&[
				"trained_model",
				"X_test",
				"y_test",
				"params:output_directory",
			],
			&[],
			|inputs| {
				let model: &Model = inputs.get(0)?;
				let x_test: &DataFrame = inputs.get(1)?;
				let y_test: &DataFrame = inputs.get(2)?;
				let output_directory: PathBuf = inputs.param(3)?;
				plot_confusion_matrix(model, x_test, y_test, &output_directory)?;
				Ok(vec![])
			},
		),
	])
}

/// Every metric is in `[0, 1]`. A metric whose denominator is zero is `0.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
	pub accuracy: f32,
	pub precision: f32,
	pub recall: f32,
	pub f1_score: f32,
}

pub fn evaluate_model(model: &Model, x_test: &DataFrame, y_test: &DataFrame) -> Result<ModelMetrics> {
	let output = test_model(model, x_test, y_test)?;
	let metrics = ModelMetrics {
		accuracy: output.accuracy,
		precision: output.precision,
		recall: output.recall,
		f1_score: output.f1_score,
	};
	tracing::info!(
		accuracy = metrics.accuracy,
		precision = metrics.precision,
		recall = metrics.recall,
		f1_score = metrics.f1_score,
		"Evaluated the model"
	);
	Ok(metrics)
}

/// Draw the confusion matrix of the model's predictions on the test set to `<output_directory>/plots/confusion_matrix.png`. Returns the path of the image.
pub fn plot_confusion_matrix(
	model: &Model,
	x_test: &DataFrame,
	y_test: &DataFrame,
	output_directory: &Path,
) -> Result<PathBuf> {
	let output = test_model(model, x_test, y_test)?;
	let path = output_directory.join("plots").join("confusion_matrix.png");
	create_parent_dir(&path)?;
	draw_confusion_matrix(&output.confusion_matrix, &path)?;
	tracing::info!("Saved the confusion matrix to {}", path.display());
	Ok(path)
}

fn test_model(
	model: &Model,
	x_test: &DataFrame,
	y_test: &DataFrame,
) -> Result<BinaryClassificationMetricsOutput> {
	let labels = labels(y_test)?;
	let predictions = model.predict(x_test)?;
	if predictions.len() != labels.len() {
		bail!(
			"there are {} rows of test features but {} labels",
			predictions.len(),
			labels.len()
		);
	}
	Ok(BinaryClassificationMetrics::compute(
		BinaryClassificationMetricsInput {
			predictions: predictions.view(),
			labels: ArrayView1::from(labels.as_slice()),
		},
	))
}

const IMAGE_SIZE: u32 = 800;
const CELL_MARGIN: i32 = 4;
const LIGHT: (f64, f64, f64) = (247.0, 251.0, 255.0);
const DARK: (f64, f64, f64) = (8.0, 48.0, 107.0);

/// Draw a 2x2 heat map with rows for the true label and columns for the predicted label, negative first. The count in each cell is drawn with seven segment digits.
fn draw_confusion_matrix(confusion_matrix: &[[u64; 2]; 2], path: &Path) -> Result<()> {
	let root = BitMapBackend::new(path, (IMAGE_SIZE, IMAGE_SIZE)).into_drawing_area();
	root.fill(&WHITE)?;
	let max_count = confusion_matrix.iter().flatten().copied().max().unwrap_or(0).max(1);
	let cells = root.split_evenly((2, 2));
	for (cell_index, cell) in cells.iter().enumerate() {
		let count = confusion_matrix[cell_index / 2][cell_index % 2];
		let shade = count as f64 / max_count as f64;
		let cell = cell.margin(CELL_MARGIN, CELL_MARGIN, CELL_MARGIN, CELL_MARGIN);
		cell.fill(&heat_color(shade))?;
		let digit_color = if shade > 0.5 { WHITE } else { BLACK };
		let (width, height) = cell.dim_in_pixel();
		let digits = count.to_string();
		for (rect, on) in layout_digits(&digits, width as i32, height as i32) {
			if on {
				cell.draw(&Rectangle::new(rect, digit_color.filled()))?;
			}
		}
	}
	root.present()?;
	Ok(())
}

fn heat_color(shade: f64) -> RGBColor {
	let mix = |light: f64, dark: f64| (light + (dark - light) * shade).round() as u8;
	RGBColor(
		mix(LIGHT.0, DARK.0),
		mix(LIGHT.1, DARK.1),
		mix(LIGHT.2, DARK.2),
	)
}

/// The segments lit for each digit, with bit 0 for the top segment and then clockwise, ending with the middle segment in bit 6.
const DIGIT_SEGMENTS: [u8; 10] = [0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F];

type SegmentRect = [(i32, i32); 2];

/// Lay out `digits` centered in a `width` by `height` area. Returns every segment of every digit along with whether it is lit.
fn layout_digits(digits: &str, width: i32, height: i32) -> Vec<(SegmentRect, bool)> {
	let n_digits = digits.chars().count() as i32;
	if n_digits == 0 {
		return Vec::new();
	}
	let mut digit_height = height / 3;
	let mut digit_width = digit_height / 2;
	let mut gap = digit_width / 3;
	// Shrink long numbers to fit.
	let max_total_width = width * 4 / 5;
	let total_width = n_digits * digit_width + (n_digits - 1) * gap;
	if total_width > max_total_width {
		digit_width = max_total_width / (n_digits + (n_digits - 1) / 3);
		digit_height = digit_width * 2;
		gap = digit_width / 3;
	}
	let thickness = (digit_width / 5).max(1);
	let total_width = n_digits * digit_width + (n_digits - 1) * gap;
	let left = (width - total_width) / 2;
	let top = (height - digit_height) / 2;
	digits
		.chars()
		.filter_map(|c| c.to_digit(10))
		.enumerate()
		.flat_map(|(position, digit)| {
			let x = left + position as i32 * (digit_width + gap);
			let segments = DIGIT_SEGMENTS[digit as usize];
			segment_rects(x, top, digit_width, digit_height, thickness)
				.into_iter()
				.enumerate()
				.map(move |(segment, rect)| (rect, segments & (1 << segment) != 0))
		})
		.collect()
}

fn segment_rects(x: i32, y: i32, width: i32, height: i32, thickness: i32) -> [SegmentRect; 7] {
	let middle = y + height / 2;
	let (right, bottom) = (x + width, y + height);
	[
		[(x, y), (right, y + thickness)],
		[(right - thickness, y), (right, middle)],
		[(right - thickness, middle), (right, bottom)],
		[(x, bottom - thickness), (right, bottom)],
		[(x, middle), (x + thickness, bottom)],
		[(x, y), (x + thickness, middle)],
		[
			(x, middle - thickness / 2),
			(right, middle + thickness - thickness / 2),
		],
	]
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hyperparameters::Hyperparameters;
	use insurance_dataframe::{Column, NumberColumn};

	fn number_column(name: &str, data: &[f64]) -> Column {
		Column::Number(NumberColumn {
			name: name.to_owned(),
			data: data.to_vec(),
		})
	}

	fn sample_test_data() -> (DataFrame, DataFrame) {
		let x = DataFrame {
			columns: vec![
				number_column("feature1", &[1.0, 2.0, 5.0, 6.0, 9.0, 10.0]),
				number_column("feature2", &[10.0, 9.0, 6.0, 5.0, 2.0, 1.0]),
			],
		};
		let y = DataFrame {
			columns: vec![number_column("target", &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0])],
		};
		(x, y)
	}

	fn trained_model() -> Model {
		let (x, y) = sample_test_data();
		let hyperparameters = Hyperparameters {
			n_estimators: 10,
			min_child_samples: 1,
			..Default::default()
		};
		Model::train(&x, &labels(&y).unwrap(), &hyperparameters).unwrap()
	}

	#[test]
	fn test_evaluate_model() {
		let (x_test, y_test) = sample_test_data();
		let metrics = evaluate_model(&trained_model(), &x_test, &y_test).unwrap();
		assert_eq!(
			metrics,
			ModelMetrics {
				accuracy: 1.0,
				precision: 1.0,
				recall: 1.0,
				f1_score: 1.0,
			}
		);
		insta::assert_snapshot!(serde_json::to_string(&metrics).unwrap(), @r###"{"accuracy":1.0,"precision":1.0,"recall":1.0,"f1_score":1.0}"###);
	}

	#[test]
	fn test_evaluate_model_without_positive_predictions() {
		let (x_test, _) = sample_test_data();
		let y_train = DataFrame {
			columns: vec![number_column("target", &[0.0; 6])],
		};
		let model = Model::train(
			&x_test,
			&labels(&y_train).unwrap(),
			&Hyperparameters::default(),
		)
		.unwrap();
		let (_, y_test) = sample_test_data();
		let metrics = evaluate_model(&model, &x_test, &y_test).unwrap();
		assert_eq!(metrics.accuracy, 0.5);
		assert_eq!(metrics.precision, 0.0);
		assert_eq!(metrics.recall, 0.0);
		assert_eq!(metrics.f1_score, 0.0);
	}

	#[test]
	fn test_plot_confusion_matrix() {
		let dir = tempfile::tempdir().unwrap();
		let (x_test, y_test) = sample_test_data();
		let plot_path = dir.path().join("plots").join("confusion_matrix.png");
		assert!(!plot_path.exists());
		let path = plot_confusion_matrix(&trained_model(), &x_test, &y_test, dir.path()).unwrap();
		assert_eq!(path, plot_path);
		let bytes = std::fs::read(&plot_path).unwrap();
		assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
	}

	#[test]
	fn test_layout_digits() {
		let segments = layout_digits("10", 400, 400);
		assert_eq!(segments.len(), 14);
		let lit: Vec<bool> = segments.iter().map(|(_, on)| *on).collect();
		assert_eq!(
			lit,
			vec![
				false, true, true, false, false, false, false, true, true, true, true, true,
				true, false
			]
		);
		for ([(x0, y0), (x1, y1)], _) in segments {
			assert!(0 <= x0 && x0 < x1 && x1 <= 400);
			assert!(0 <= y0 && y0 < y1 && y1 <= 400);
		}
		let wide = layout_digits("123456789", 100, 400);
		assert!(wide
			.iter()
			.all(|([(x0, _), (x1, _)], _)| *x0 >= 0 && *x1 <= 100));
	}

	#[test]
	fn test_pipeline() {
		let pipeline = create_pipeline();
		assert_eq!(
			pipeline.inputs(),
			vec![
				"trained_model",
				"X_test",
				"y_test",
				"params:output_directory"
			]
		);
		assert_eq!(pipeline.outputs(), vec!["model_metrics"]);
	}
}
