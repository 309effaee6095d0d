use std::{
	any::{type_name, Any},
	fmt,
	sync::Arc,
};

/// An `Artifact` is a value produced by a node. It is cheap to clone, so the catalog can hand the same value to every node that reads it.
#[derive(Clone)]
pub struct Artifact {
	value: Arc<dyn Any + Send + Sync>,
	type_name: &'static str,
}

impl Artifact {
	pub fn new<T>(value: T) -> Self
	where
		T: Any + Send + Sync,
	{
		Self {
			value: Arc::new(value),
			type_name: type_name::<T>(),
		}
	}

	pub fn downcast_ref<T>(&self) -> Option<&T>
	where
		T: Any,
	{
		self.value.downcast_ref::<T>()
	}

	/// The name of the type this artifact was created with.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}
}

impl fmt::Debug for Artifact {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Artifact<{}>", self.type_name)
	}
}
