use anyhow::{anyhow, Result};
use insurance_dataframe::Column;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/**
An `IdentityFeatureGroup` passes a single number column from the input dataframe to the output features untouched. Missing values stay `NaN`, which the tree crate sends down the missing branch.

| dataframe value | feature value |
|-----------------|---------------|
| 0.2             | 0.2           |
| 3.0             | 3.0           |
| NaN             | NaN           |
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityFeatureGroup {
	pub source_column_name: String,
}

impl IdentityFeatureGroup {
	pub fn compute_array_f32(&self, mut features: ArrayViewMut2<f32>, column: &Column) -> Result<()> {
		match column {
			Column::Unknown(_) => features.fill(f32::NAN),
			Column::Number(column) => {
				for (feature, value) in features.iter_mut().zip(column.data.iter()) {
					*feature = *value as f32;
				}
			}
			_ => {
				return Err(anyhow!(
					"expected column {:?} to contain numbers",
					self.source_column_name
				))
			}
		}
		Ok(())
	}
}
