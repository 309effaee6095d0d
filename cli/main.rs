//! This module contains the main entrypoint to the insurance-prediction cli.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use insurance_core::{register_pipelines, ModelMetrics, Session, DEFAULT_PIPELINE_NAME};
use insurance_util::table::Table;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
	name = "insurance-prediction",
	version,
	about = "Predict insurance claims with gradient boosted trees."
)]
struct Options {
	/// The pipeline to run: dp, mt or me. Runs all three when omitted.
	pipeline: Option<String>,
	/// The project directory containing conf/.
	#[arg(long, default_value = ".")]
	project_path: PathBuf,
}

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();
	let options = Options::parse();
	if let Err(error) = run(options) {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn run(options: Options) -> Result<()> {
	let session = Session::create(&options.project_path)?;
	let pipeline_name = options.pipeline.as_deref().unwrap_or(DEFAULT_PIPELINE_NAME);
	let outputs = session.run(Some(pipeline_name))?;

	// Print the metrics if this run computed them.
	let computed_metrics = register_pipelines()
		.get(pipeline_name)
		.map_or(false, |pipeline| {
			pipeline.outputs().iter().any(|output| output == "model_metrics")
		});
	if computed_metrics {
		let artifact = match outputs.get("model_metrics") {
			Some(artifact) => artifact.clone(),
			None => session.config().data_catalog().load("model_metrics")?,
		};
		let value = artifact
			.downcast_ref::<serde_json::Value>()
			.context("the model metrics are not json")?;
		let metrics: ModelMetrics = serde_json::from_value(value.clone())?;
		print_metrics(&metrics);
	}
	Ok(())
}

fn print_metrics(metrics: &ModelMetrics) {
	let rows = [
		("accuracy", metrics.accuracy),
		("precision", metrics.precision),
		("recall", metrics.recall),
		("f1_score", metrics.f1_score),
	]
	.iter()
	.map(|(name, value)| vec![(*name).to_owned(), format!("{:.4}", value)])
	.collect();
	let table = Table::new(vec!["metric".to_owned(), "value".to_owned()], rows);
	println!("{}", table);
}
