use anyhow::Result;
use insurance_dataframe::{DataFrame, FromCsvOptions};
use insurance_pipeline::{expect_artifact, Artifact, Dataset};
use std::path::PathBuf;

/// Stores a `DataFrame` as a csv file. Column types are inferred again on load.
pub struct CsvDataset {
	path: PathBuf,
}

impl CsvDataset {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl Dataset for CsvDataset {
	fn load(&self) -> Result<Artifact> {
		let dataframe = DataFrame::from_path(&self.path, FromCsvOptions::default())?;
		Ok(Artifact::new(dataframe))
	}

	fn save(&self, artifact: &Artifact) -> Result<()> {
		let dataframe = expect_artifact::<DataFrame>(artifact)?;
		dataframe.to_path(&self.path)
	}

	fn exists(&self) -> bool {
		self.path.is_file()
	}

	fn describe(&self) -> String {
		format!("CsvDataset({})", self.path.display())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use insurance_dataframe::{Column, NumberColumn};

	#[test]
	fn test_csv_dataset() {
		let dir = tempfile::tempdir().unwrap();
		let dataset = CsvDataset::new(dir.path().join("03_primary").join("y_test.csv"));
		assert!(!dataset.exists());
		let y_test = DataFrame {
			columns: vec![Column::Number(NumberColumn {
				name: "target".to_owned(),
				data: vec![0.0, 1.0, 1.0],
			})],
		};
		dataset.save(&Artifact::new(y_test.clone())).unwrap();
		assert!(dataset.exists());
		let loaded = dataset.load().unwrap();
		assert_eq!(loaded.downcast_ref::<DataFrame>(), Some(&y_test));
		assert!(dataset.save(&Artifact::new(String::new())).is_err());
	}
}
