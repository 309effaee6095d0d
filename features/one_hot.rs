/*!
One hot encoding of dataframe columns. Each encoded column is removed and replaced by one `0/1` number column per distinct value observed in it, named `<column>_<value>`. The indicator columns are appended after the remaining columns, grouped by source column in the order requested, with the values of each column sorted. Number values sort numerically and everything else sorts by string. An example with a missing value gets zero in every indicator column of that source column.
*/

use anyhow::{anyhow, Result};
use insurance_dataframe::{Column, DataFrame, NumberColumn};
use insurance_util::finite::{Finite, ToFinite};
use std::collections::{BTreeMap, BTreeSet};

pub fn indicator_column_name(column_name: &str, value: &str) -> String {
	format!("{}_{}", column_name, value)
}

/// One hot encode the columns named `column_names`. It is an error if any of them is missing from `dataframe`.
pub fn one_hot_encode(mut dataframe: DataFrame, column_names: &[String]) -> Result<DataFrame> {
	let mut columns = Vec::with_capacity(column_names.len());
	for column_name in column_names {
		let column = dataframe
			.remove_column(column_name)
			.ok_or_else(|| anyhow!("the column {:?} to one hot encode was not found", column_name))?;
		columns.push(column);
	}
	for column in columns.iter() {
		let indicator_columns = match column {
			Column::Unknown(_) => Vec::new(),
			Column::Number(column) => {
				let keys: Vec<Option<Finite<f64>>> = column
					.data
					.iter()
					.map(|value| value.to_finite().ok())
					.collect();
				indicator_columns(&column.name, &keys)
			}
			Column::Enum(column) => {
				let keys: Vec<Option<&str>> = (0..column.data.len())
					.map(|index| column.value(index))
					.collect();
				indicator_columns(&column.name, &keys)
			}
			Column::Text(column) => {
				let keys: Vec<Option<&str>> = column
					.data
					.iter()
					.map(|value| Some(value.as_str()).filter(|value| !value.is_empty()))
					.collect();
				indicator_columns(&column.name, &keys)
			}
		};
		dataframe.columns.extend(indicator_columns);
	}
	Ok(dataframe)
}

fn indicator_columns<K>(column_name: &str, keys: &[Option<K>]) -> Vec<Column>
where
	K: Ord + std::fmt::Display,
{
	let distinct: BTreeSet<&K> = keys.iter().flatten().collect();
	let positions: BTreeMap<&K, usize> = distinct
		.into_iter()
		.enumerate()
		.map(|(position, key)| (key, position))
		.collect();
	let mut data = vec![vec![0.0; keys.len()]; positions.len()];
	for (example_index, key) in keys.iter().enumerate() {
		if let Some(position) = key.as_ref().and_then(|key| positions.get(key)) {
			data[*position][example_index] = 1.0;
		}
	}
	positions
		.keys()
		.zip(data)
		.map(|(key, data)| {
			Column::Number(NumberColumn {
				name: indicator_column_name(column_name, &key.to_string()),
				data,
			})
		})
		.collect()
}
