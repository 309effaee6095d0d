use super::*;
use anyhow::{Context, Result};
use std::path::Path;

impl DataFrame {
	/// Write the dataframe as csv, creating the parent directory of `path` if it does not exist.
	pub fn to_path(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("failed to create {}", parent.display()))?;
		}
		let mut writer = csv::Writer::from_path(path)
			.with_context(|| format!("failed to create {}", path.display()))?;
		self.to_csv(&mut writer)?;
		writer.flush()?;
		Ok(())
	}

	/// Missing values are written as empty fields. Numbers with no fractional part are written without a decimal point.
	pub fn to_csv<W>(&self, writer: &mut csv::Writer<W>) -> Result<()>
	where
		W: std::io::Write,
	{
		writer.write_record(self.column_names())?;
		let mut record: Vec<String> = vec![String::new(); self.ncols()];
		for index in 0..self.nrows() {
			for (value, column) in record.iter_mut().zip(self.columns.iter()) {
				value.clear();
				match column {
					Column::Unknown(_) => {}
					Column::Number(column) => {
						let number = column.data[index];
						if number.is_finite() {
							value.push_str(&number.to_string());
						}
					}
					Column::Enum(column) => {
						if let Some(option) = column.value(index) {
							value.push_str(option);
						}
					}
					Column::Text(column) => value.push_str(&column.data[index]),
				}
			}
			writer.write_record(&record)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_write_then_load() {
		let dataframe = DataFrame {
			columns: vec![
				Column::Number(NumberColumn {
					name: "Exppdays".to_owned(),
					data: vec![365.0, 0.5, f64::NAN],
				}),
				Column::Enum(EnumColumn {
					name: "Type".to_owned(),
					options: vec!["A".to_owned(), "B".to_owned()],
					data: vec![NonZeroUsize::new(2), None, NonZeroUsize::new(1)],
				}),
			],
		};
		let mut writer = csv::Writer::from_writer(Vec::new());
		dataframe.to_csv(&mut writer).unwrap();
		let bytes = writer.into_inner().unwrap();
		insta::assert_snapshot!(String::from_utf8(bytes.clone()).unwrap().trim_end(), @r###"
  Exppdays,Type
  365,B
  0.5,
  ,A
  "###);
		let mut reader = csv::Reader::from_reader(std::io::Cursor::new(bytes));
		let reloaded = DataFrame::from_csv(&mut reader, FromCsvOptions::default()).unwrap();
		let exppdays = reloaded.column("Exppdays").unwrap().as_number().unwrap();
		assert_eq!(exppdays.data[..2], [365.0, 0.5]);
		assert!(exppdays.data[2].is_nan());
	}
}
