use std::io::Write;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::config::{QueryLimit, RunConfig};
use crate::runner::RunOutcome;
use crate::stats::RunStatistics;

/// Print a summary of the run configuration before starting.
pub fn print_config_summary(config: &RunConfig) {
	println!(
		"Starting DNS performance test for {} ({} record)",
		config.domain, config.record_kind,
	);
	println!("Using DNS server: {}", config.destination);
	println!("Concurrency: {}", config.concurrency);
	match config.limit {
		QueryLimit::Count(n) => println!("Number of queries: {}", n),
		QueryLimit::Unbounded => println!("Running continuously. Press Ctrl+C to stop."),
	}
}

/// Rewrite the progress line in place.
pub fn print_progress(produced: u64, limit: QueryLimit) {
	let mut line = format!("\rCompleted {} queries", produced);
	if let QueryLimit::Count(total) = limit {
		if total > 0 {
			let percent = produced as f64 / total as f64 * 100.0;
			line.push_str(&format!(" ({:.1}%)", percent));
		}
	}
	let mut stdout = std::io::stdout().lock();
	// Progress is best effort; a closed stdout must not stop the run
	let _ = stdout.write_all(line.as_bytes());
	let _ = stdout.flush();
}

pub fn print_shutdown_notice(outcome: RunOutcome) {
	match outcome {
		RunOutcome::Interrupted => println!("\nInterrupted by user. Shutting down..."),
		RunOutcome::Completed => println!("\nAll queries completed. Shutting down..."),
	}
}

fn format_ms(value: Option<f64>) -> String {
	match value {
		Some(ms) => format!("{:.1} ms", ms),
		None => "n/a".to_string(),
	}
}

/// Label/value pairs shown in the final statistics table.
pub fn report_rows(stats: &RunStatistics) -> Vec<(&'static str, String)> {
	let average = match stats.mean {
		Some(mean) => format!("{:.4} seconds", mean.as_secs_f64()),
		None => "n/a".to_string(),
	};
	vec![
		("Total queries", stats.total.to_string()),
		("Issued queries", stats.issued.to_string()),
		(
			"Successful queries",
			format!("{} ({:.2}%)", stats.succeeded, stats.success_rate),
		),
		(
			"Failed queries",
			format!("{} ({:.2}%)", stats.failed, stats.failure_rate()),
		),
		("Total time", format!("{:.2} seconds", stats.elapsed.as_secs_f64())),
		("Average query time", average),
		("Median (p50)", format_ms(stats.p50_ms)),
		("p95", format_ms(stats.p95_ms)),
		("Std dev", format_ms(stats.stddev_ms)),
		("Queries per second", format!("{:.2}", stats.queries_per_second)),
	]
}

/// Print the final statistics as a formatted table.
pub fn print_report(config: &RunConfig, stats: &RunStatistics) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Metric", "Value"]);
	for (label, value) in report_rows(stats) {
		table.add_row(vec![label.to_string(), value]);
	}

	println!("\nResults for {} ({} record):", config.domain, config.record_kind);
	println!("{table}");
}

/// Write the final statistics to a CSV file.
pub fn write_csv(path: &str, config: &RunConfig, stats: &RunStatistics) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)
		.with_context(|| format!("failed to create CSV file '{}'", path))?;

	writer.write_record([
		"domain", "record_type", "server", "concurrency",
		"issued", "total", "succeeded", "failed", "success_rate",
		"elapsed_s", "mean_ms", "p50_ms", "p95_ms", "stddev_ms",
		"queries_per_second",
	])?;

	let optional = |v: Option<f64>| v.map(|ms| format!("{:.3}", ms)).unwrap_or_default();
	writer.write_record([
		config.domain.clone(),
		config.record_kind.to_string(),
		config.destination.clone(),
		config.concurrency.to_string(),
		stats.issued.to_string(),
		stats.total.to_string(),
		stats.succeeded.to_string(),
		stats.failed.to_string(),
		format!("{:.2}", stats.success_rate),
		format!("{:.3}", stats.elapsed.as_secs_f64()),
		optional(stats.mean.map(|d| d.as_secs_f64() * 1000.0)),
		optional(stats.p50_ms),
		optional(stats.p95_ms),
		optional(stats.stddev_ms),
		format!("{:.2}", stats.queries_per_second),
	])?;

	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}
