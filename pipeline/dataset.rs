use crate::Artifact;
use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
	any::{type_name, Any},
	fs,
	marker::PhantomData,
	path::{Path, PathBuf},
};

/// A `Dataset` persists the artifact for one catalog name.
pub trait Dataset: Send + Sync {
	fn load(&self) -> Result<Artifact>;
	fn save(&self, artifact: &Artifact) -> Result<()>;
	/// Whether a previously saved artifact is available to load.
	fn exists(&self) -> bool;
	/// A short description for log and error messages.
	fn describe(&self) -> String;
}

/// Downcast an artifact to the type a dataset stores, with an error naming both types.
pub fn expect_artifact<T: Any>(artifact: &Artifact) -> Result<&T> {
	artifact.downcast_ref::<T>().ok_or_else(|| {
		anyhow!(
			"expected a {} but the artifact is a {}",
			type_name::<T>(),
			artifact.type_name()
		)
	})
}

/// Create the parent directory of `path` if it does not exist.
pub fn create_parent_dir(path: &Path) -> Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)
				.with_context(|| format!("failed to create directory {}", parent.display()))?;
		}
	}
	Ok(())
}

/// Stores a `String` as a UTF-8 text file.
pub struct TextDataset {
	path: PathBuf,
}

impl TextDataset {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl Dataset for TextDataset {
	fn load(&self) -> Result<Artifact> {
		let text = fs::read_to_string(&self.path)
			.with_context(|| format!("failed to read {}", self.path.display()))?;
		Ok(Artifact::new(text))
	}

	fn save(&self, artifact: &Artifact) -> Result<()> {
		let text = expect_artifact::<String>(artifact)?;
		create_parent_dir(&self.path)?;
		fs::write(&self.path, text)
			.with_context(|| format!("failed to write {}", self.path.display()))
	}

	fn exists(&self) -> bool {
		self.path.is_file()
	}

	fn describe(&self) -> String {
		format!("TextDataset({})", self.path.display())
	}
}

/// Stores a value as pretty printed JSON. By default the value is a `serde_json::Value`.
pub struct JsonDataset<T = serde_json::Value> {
	path: PathBuf,
	marker: PhantomData<fn() -> T>,
}

impl<T> JsonDataset<T> {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			marker: PhantomData,
		}
	}
}

impl<T> Dataset for JsonDataset<T>
where
	T: Serialize + DeserializeOwned + Any + Send + Sync,
{
	fn load(&self) -> Result<Artifact> {
		let bytes =
			fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))?;
		let value: T = serde_json::from_slice(&bytes)
			.with_context(|| format!("failed to parse {}", self.path.display()))?;
		Ok(Artifact::new(value))
	}

	fn save(&self, artifact: &Artifact) -> Result<()> {
		let value = expect_artifact::<T>(artifact)?;
		create_parent_dir(&self.path)?;
		let json = serde_json::to_string_pretty(value)?;
		fs::write(&self.path, json)
			.with_context(|| format!("failed to write {}", self.path.display()))
	}

	fn exists(&self) -> bool {
		self.path.is_file()
	}

	fn describe(&self) -> String {
		format!("JsonDataset({})", self.path.display())
	}
}

/// Stores a value as MessagePack.
pub struct MsgPackDataset<T> {
	path: PathBuf,
	marker: PhantomData<fn() -> T>,
}

impl<T> MsgPackDataset<T> {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			marker: PhantomData,
		}
	}
}

impl<T> Dataset for MsgPackDataset<T>
where
	T: Serialize + DeserializeOwned + Any + Send + Sync,
{
	fn load(&self) -> Result<Artifact> {
		let bytes =
			fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))?;
		let value: T = rmp_serde::from_slice(&bytes)
			.with_context(|| format!("failed to decode {}", self.path.display()))?;
		Ok(Artifact::new(value))
	}

	fn save(&self, artifact: &Artifact) -> Result<()> {
		let value = expect_artifact::<T>(artifact)?;
		create_parent_dir(&self.path)?;
		let bytes = rmp_serde::to_vec_named(value)?;
		fs::write(&self.path, bytes)
			.with_context(|| format!("failed to write {}", self.path.display()))
	}

	fn exists(&self) -> bool {
		self.path.is_file()
	}

	fn describe(&self) -> String {
		format!("MsgPackDataset({})", self.path.display())
	}
}
