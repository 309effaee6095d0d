/*!
This crate turns dataframes into the `f32` feature matrices the tree crate trains on. It has two parts:

1. [`one_hot`] expands categorical columns of a dataframe into one `0/1` indicator column per distinct value.
2. A [`FeatureGroup`] describes how one column of the input dataframe becomes one or more columns of the feature matrix. The groups are chosen once from the training dataframe and stored with the model so the same transformation is applied at prediction time.
*/

#![allow(clippy::tabs_in_doc_comments)]

use anyhow::{anyhow, Result};
use insurance_dataframe::{Column, DataFrame};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

mod identity;
pub mod one_hot;
mod one_hot_encoded;

pub use self::identity::IdentityFeatureGroup;
pub use self::one_hot_encoded::OneHotEncodedFeatureGroup;

/// This enum describes how to transform one column from the input dataframe to one or more columns in the output features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FeatureGroup {
	Identity(IdentityFeatureGroup),
	OneHotEncoded(OneHotEncodedFeatureGroup),
}

impl FeatureGroup {
	/// Choose the feature group for a training column. Number and unknown columns pass through, enum columns are one hot encoded.
	pub fn train(column: &Column) -> Result<Self> {
		match column {
			Column::Unknown(column) => Ok(FeatureGroup::Identity(IdentityFeatureGroup {
				source_column_name: column.name.clone(),
			})),
			Column::Number(column) => Ok(FeatureGroup::Identity(IdentityFeatureGroup {
				source_column_name: column.name.clone(),
			})),
			Column::Enum(column) => Ok(FeatureGroup::OneHotEncoded(OneHotEncodedFeatureGroup {
				source_column_name: column.name.clone(),
				options: column.options.clone(),
			})),
			Column::Text(column) => Err(anyhow!(
				"column {:?} contains text, which cannot be used as a feature",
				column.name
			)),
		}
	}

	pub fn source_column_name(&self) -> &str {
		match self {
			FeatureGroup::Identity(s) => &s.source_column_name,
			FeatureGroup::OneHotEncoded(s) => &s.source_column_name,
		}
	}

	pub fn n_features(&self) -> usize {
		match self {
			FeatureGroup::Identity(_) => 1,
			FeatureGroup::OneHotEncoded(s) => s.options.len(),
		}
	}

	pub fn feature_names(&self) -> Vec<String> {
		match self {
			FeatureGroup::Identity(s) => vec![s.source_column_name.clone()],
			FeatureGroup::OneHotEncoded(s) => s
				.options
				.iter()
				.map(|option| one_hot::indicator_column_name(&s.source_column_name, option))
				.collect(),
		}
	}
}

/// Choose one feature group per column of the training dataframe.
pub fn compute_feature_groups(dataframe: &DataFrame) -> Result<Vec<FeatureGroup>> {
	dataframe.columns.iter().map(FeatureGroup::train).collect()
}

/// Compute the feature matrix for `dataframe`, with one row per example and the features of each group laid out in order.
pub fn compute_features_array_f32(
	dataframe: &DataFrame,
	feature_groups: &[FeatureGroup],
) -> Result<Array2<f32>> {
	let n_features = feature_groups.iter().map(|group| group.n_features()).sum();
	let mut features = Array::zeros((dataframe.nrows(), n_features));
	let mut feature_index = 0;
	for feature_group in feature_groups.iter() {
		let column = dataframe
			.column(feature_group.source_column_name())
			.ok_or_else(|| {
				anyhow!(
					"the feature column {:?} is missing",
					feature_group.source_column_name()
				)
			})?;
		let n = feature_group.n_features();
		let slice = features.slice_mut(s![.., feature_index..feature_index + n]);
		match feature_group {
			FeatureGroup::Identity(feature_group) => {
				feature_group.compute_array_f32(slice, column)?
			}
			FeatureGroup::OneHotEncoded(feature_group) => {
				feature_group.compute_array_f32(slice, column)?
			}
		}
		feature_index += n;
	}
	Ok(features)
}

#[cfg(test)]
mod tests {
	use super::*;
	use insurance_dataframe::{EnumColumn, NumberColumn, TextColumn};
	use std::num::NonZeroUsize;

	fn dataframe() -> DataFrame {
		DataFrame {
			columns: vec![
				Column::Number(NumberColumn {
					name: "Age".to_owned(),
					data: vec![34.0, f64::NAN, 61.0],
				}),
				Column::Enum(EnumColumn {
					name: "Category".to_owned(),
					options: vec!["Large".to_owned(), "Medium".to_owned(), "Small".to_owned()],
					data: vec![NonZeroUsize::new(3), NonZeroUsize::new(1), None],
				}),
			],
		}
	}

	#[test]
	fn test_compute_features() {
		let dataframe = dataframe();
		let feature_groups = compute_feature_groups(&dataframe).unwrap();
		let names: Vec<String> = feature_groups
			.iter()
			.flat_map(|group| group.feature_names())
			.collect();
		assert_eq!(
			names,
			vec!["Age", "Category_Large", "Category_Medium", "Category_Small"]
		);
		let features = compute_features_array_f32(&dataframe, &feature_groups).unwrap();
		assert_eq!(features.dim(), (3, 4));
		assert_eq!(features.row(0).to_vec(), vec![34.0, 0.0, 0.0, 1.0]);
		assert!(features[[1, 0]].is_nan());
		assert_eq!(features.slice(s![1, 1..]).to_vec(), vec![1.0, 0.0, 0.0]);
		assert_eq!(features.row(2).to_vec(), vec![61.0, 0.0, 0.0, 0.0]);
	}

	#[test]
	fn test_text_columns_are_rejected() {
		let column = Column::Text(TextColumn {
			name: "Comment".to_owned(),
			data: vec!["late".to_owned()],
		});
		assert!(FeatureGroup::train(&column).is_err());
	}

	#[test]
	fn test_missing_column() {
		let feature_groups = compute_feature_groups(&dataframe()).unwrap();
		let mut dataframe = dataframe();
		dataframe.remove_column("Age");
		assert!(compute_features_array_f32(&dataframe, &feature_groups).is_err());
	}
}
