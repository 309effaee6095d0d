use super::*;
use anyhow::{Context, Result};
use fnv::FnvHashMap;
use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
};

#[derive(Clone, Default)]
pub struct FromCsvOptions {
	/// Column types to use instead of inferring them, keyed by column name.
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub infer_options: InferOptions,
}

#[derive(Clone, Debug)]
pub struct InferOptions {
	/// A column whose values are not all numbers is inferred as an enum column if it has at most this many unique values, and a text column otherwise.
	pub enum_max_unique_values: usize,
}

impl Default for InferOptions {
	fn default() -> Self {
		Self {
			enum_max_unique_values: 100,
		}
	}
}

/// These values are considered missing.
pub const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "NA", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions) -> Result<Self> {
		let mut reader = csv::Reader::from_path(path)
			.with_context(|| format!("failed to open {}", path.display()))?;
		Self::from_csv(&mut reader, options)
			.with_context(|| format!("failed to load {}", path.display()))
	}

	pub fn from_csv<R>(reader: &mut csv::Reader<R>, options: FromCsvOptions) -> Result<Self>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.to_owned())
			.collect();
		let start_position = reader.position().clone();
		let infer_options = &options.infer_options;
		let column_types = options.column_types.unwrap_or_default();

		// Columns with a type given in the options skip inference.
		let mut infer_stats: Vec<Option<InferStats>> = column_names
			.iter()
			.map(|column_name| {
				if column_types.contains_key(column_name) {
					None
				} else {
					Some(InferStats::new(infer_options))
				}
			})
			.collect();

		// The infer pass is only necessary if one or more columns did not have its type specified.
		let mut n_rows = None;
		if infer_stats.iter().any(|infer_stats| infer_stats.is_some()) {
			let mut record = csv::StringRecord::new();
			let mut n_rows_computed = 0;
			while reader.read_record(&mut record)? {
				n_rows_computed += 1;
				for (infer_stats, value) in infer_stats.iter_mut().zip(record.iter()) {
					if let Some(infer_stats) = infer_stats {
						infer_stats.update(value);
					}
				}
			}
			n_rows = Some(n_rows_computed);
			// After inference, return to the beginning of the csv to load the values.
			reader.seek(start_position)?;
		}
		let column_types: Vec<ColumnType> = column_names
			.iter()
			.zip(infer_stats.into_iter())
			.map(|(column_name, infer_stats)| match infer_stats {
				Some(infer_stats) => infer_stats.finalize(),
				None => column_types[column_name].clone(),
			})
			.collect();

		let mut dataframe = Self::new(column_names, column_types);
		if let Some(n_rows) = n_rows {
			for column in dataframe.columns.iter_mut() {
				match column {
					Column::Unknown(_) => {}
					Column::Number(column) => column.data.reserve_exact(n_rows),
					Column::Enum(column) => column.data.reserve_exact(n_rows),
					Column::Text(column) => column.data.reserve_exact(n_rows),
				}
			}
		}
		// Enum values are looked up by string, so index the options of each enum column once.
		let option_indexes: Vec<Option<FnvHashMap<String, NonZeroUsize>>> = dataframe
			.columns
			.iter()
			.map(|column| {
				column.as_enum().map(|column| {
					column
						.options
						.iter()
						.cloned()
						.zip((1..).filter_map(NonZeroUsize::new))
						.collect()
				})
			})
			.collect();

		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			for ((column, option_index), value) in dataframe
				.columns
				.iter_mut()
				.zip(option_indexes.iter())
				.zip(record.iter())
			{
				match column {
					Column::Unknown(column) => {
						column.len += 1;
					}
					Column::Number(column) => {
						let value = match lexical::parse::<f64, _>(value) {
							Ok(value) if value.is_finite() => value,
							_ => f64::NAN,
						};
						column.data.push(value);
					}
					Column::Enum(column) => {
						let value = std::str::from_utf8(value).ok().and_then(|value| {
							option_index
								.as_ref()
								.and_then(|option_index| option_index.get(value).cloned())
						});
						column.data.push(value);
					}
					Column::Text(column) => {
						column.data.push(std::str::from_utf8(value)?.to_owned())
					}
				}
			}
		}
		Ok(dataframe)
	}
}

#[derive(Clone, Debug)]
pub struct InferStats<'a> {
	infer_options: &'a InferOptions,
	column_type: InferColumnType,
	unique_values: Option<BTreeSet<String>>,
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum InferColumnType {
	Unknown,
	Number,
	Enum,
	Text,
}

impl<'a> InferStats<'a> {
	pub fn new(infer_options: &'a InferOptions) -> Self {
		Self {
			infer_options,
			column_type: InferColumnType::Unknown,
			unique_values: Some(BTreeSet::new()),
		}
	}

	pub fn update(&mut self, value: &str) {
		if DEFAULT_INVALID_VALUES.contains(&value) {
			return;
		}
		if let Some(unique_values) = self.unique_values.as_mut() {
			if !unique_values.contains(value) {
				unique_values.insert(value.to_owned());
			}
			if unique_values.len() > self.infer_options.enum_max_unique_values {
				self.unique_values = None;
			}
		}
		match self.column_type {
			InferColumnType::Unknown | InferColumnType::Number => {
				if lexical::parse::<f64, _>(value)
					.map(|value| value.is_finite())
					.unwrap_or(false)
				{
					self.column_type = InferColumnType::Number;
				} else if self.unique_values.is_some() {
					self.column_type = InferColumnType::Enum;
				} else {
					self.column_type = InferColumnType::Text;
				}
			}
			InferColumnType::Enum => {
				if self.unique_values.is_none() {
					self.column_type = InferColumnType::Text;
				}
			}
			InferColumnType::Text => {}
		}
	}

	pub fn finalize(self) -> ColumnType {
		match (self.column_type, self.unique_values) {
			(InferColumnType::Unknown, _) => ColumnType::Unknown,
			(InferColumnType::Number, _) => ColumnType::Number,
			(InferColumnType::Enum, Some(unique_values)) => ColumnType::Enum {
				options: unique_values.into_iter().collect(),
			},
			(InferColumnType::Enum, None) | (InferColumnType::Text, _) => ColumnType::Text,
		}
	}
}
