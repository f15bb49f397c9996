use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str = "info";

/// Open a diagnostic log for appending, creating it if needed.
pub fn open_log_file(path: &str) -> Result<File> {
	OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.with_context(|| format!("error opening log file '{}'", path))
}

/// Install the global tracing subscriber.
///
/// Diagnostics go to `log_path` when given, otherwise to stdout.
pub fn init_logging(log_path: Option<&str>) -> Result<()> {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	let installed = match log_path {
		Some(path) => {
			let file = open_log_file(path)?;
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_ansi(false)
				.with_writer(Mutex::new(file))
				.try_init()
		}
		None => tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stdout)
			.try_init(),
	};
	installed.map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}
