/*!
This crate implements the insurance claim prediction workflow. It defines the nodes of three pipelines and registers them by name:

| name          | pipeline                                                                    |
|---------------|-----------------------------------------------------------------------------|
| `dp`          | [`data_processing`]: download, load, preprocess and split the policies      |
| `mt`          | [`model_training`]: search for hyperparameters and train the final model    |
| `me`          | [`model_evaluation`]: compute test metrics and plot the confusion matrix    |
| `__default__` | all three, in order                                                         |

A [`Session`] loads the project configuration from `conf/` and runs one of the pipelines.

```no_run
use insurance_core::Session;
use std::path::Path;

let session = Session::create(Path::new(".")).unwrap();
session.run(Some("dp")).unwrap();
```
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod config;
pub mod csv_dataset;
pub mod data_processing;
pub mod hooks;
pub mod hyperparameters;
pub mod model;
pub mod model_evaluation;
pub mod model_training;
pub mod registry;
pub mod session;
pub mod split;
pub mod tuning;

pub use self::{
	hyperparameters::Hyperparameters,
	model::Model,
	model_evaluation::ModelMetrics,
	registry::{register_pipelines, DEFAULT_PIPELINE_NAME},
	session::Session,
};
