/*!
This crate composes a workflow out of named nodes. A [`Node`] wraps a function and declares the names of the artifacts it reads and writes. A [`Pipeline`] is a collection of nodes ordered by those names, and the [`SequentialRunner`] executes it one node at a time against a [`DataCatalog`], which stores every artifact by name and persists the ones that have a registered [`Dataset`].

```
use insurance_pipeline::{Artifact, DataCatalog, Node, Pipeline, SequentialRunner};

let pipeline = Pipeline::new(vec![
	Node::new("double", &["params:x"], &["doubled"], |inputs| {
		let x: i64 = inputs.param(0)?;
		Ok(vec![Artifact::new(x * 2)])
	}),
	Node::new("increment", &["doubled"], &["result"], |inputs| {
		let doubled: &i64 = inputs.get(0)?;
		Ok(vec![Artifact::new(doubled + 1)])
	}),
]);
let mut catalog = DataCatalog::new(serde_json::json!({ "x": 20 }).as_object().unwrap().clone());
let outputs = SequentialRunner::default().run(&pipeline, &mut catalog).unwrap();
assert_eq!(outputs["result"].downcast_ref::<i64>(), Some(&41));
```
*/

#![allow(clippy::tabs_in_doc_comments)]

pub use self::{
	artifact::Artifact,
	catalog::{DataCatalog, PARAMS_PREFIX},
	dataset::{
		create_parent_dir, expect_artifact, Dataset, JsonDataset, MsgPackDataset, TextDataset,
	},
	error::PipelineError,
	hooks::Hook,
	node::{Node, NodeInputs},
	pipeline::Pipeline,
	runner::SequentialRunner,
};

mod artifact;
mod catalog;
mod dataset;
mod error;
mod hooks;
mod node;
mod pipeline;
mod runner;
