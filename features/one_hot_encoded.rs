use anyhow::{anyhow, Result};
use fnv::FnvHashMap;
use insurance_dataframe::Column;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/**
A `OneHotEncodedFeatureGroup` creates one number feature for each option seen in an enum column during training. For each example, all of the features are 0.0 except the one for the column's value, which is 1.0. Missing values and values not seen in training produce all zeros.

| dataframe value | feature values |
|-----------------|----------------|
| missing         | [0, 0, 0]      |
| "Large"         | [1, 0, 0]      |
| "Medium"        | [0, 1, 0]      |
| "Small"         | [0, 0, 1]      |
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncodedFeatureGroup {
	pub source_column_name: String,
	pub options: Vec<String>,
}

impl OneHotEncodedFeatureGroup {
	pub fn compute_array_f32(&self, mut features: ArrayViewMut2<f32>, column: &Column) -> Result<()> {
		features.fill(0.0);
		// Values are matched by string because the column may list its options in a different order than at training time.
		let feature_indexes: FnvHashMap<&str, usize> = self
			.options
			.iter()
			.enumerate()
			.map(|(index, option)| (option.as_str(), index))
			.collect();
		let mut set = |example_index: usize, value: Option<&str>| {
			if let Some(feature_index) = value.and_then(|value| feature_indexes.get(value)) {
				features[[example_index, *feature_index]] = 1.0;
			}
		};
		match column {
			Column::Unknown(_) => {}
			Column::Enum(column) => {
				for example_index in 0..column.data.len() {
					set(example_index, column.value(example_index));
				}
			}
			Column::Text(column) => {
				for (example_index, value) in column.data.iter().enumerate() {
					set(example_index, Some(value.as_str()));
				}
			}
			Column::Number(_) => {
				return Err(anyhow!(
					"expected column {:?} to contain categories",
					self.source_column_name
				))
			}
		}
		Ok(())
	}
}
