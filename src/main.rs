mod aggregator;
mod cli;
mod config;
mod counters;
mod dns;
mod logging;
mod output;
mod pool;
mod producer;
mod query;
mod runner;
mod stats;

use std::sync::Arc;

use clap::Parser;

use crate::cli::Cli;
use crate::config::RunConfig;
use crate::query::UdpExecutor;

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn interrupted() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("failed to listen for Ctrl+C: {}", e);
		std::future::pending::<()>().await;
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	// Validate everything before the first query goes out
	let config = Arc::new(RunConfig::from_cli(&cli)?);
	logging::init_logging(cli.log_path())?;

	output::print_config_summary(&config);

	let executor = UdpExecutor::new(config.clone());
	let report = runner::run_probe(config.clone(), executor, interrupted()).await?;
	tracing::debug!(
		outcome = ?report.outcome,
		workers = report.pool.workers,
		processed = report.pool.processed,
		"probe exiting"
	);

	if let Some(path) = &cli.output {
		output::write_csv(path, &config, &report.statistics)?;
	}

	Ok(())
}
