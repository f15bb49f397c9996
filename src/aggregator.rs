use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::{CreationError, Histogram};
use tokio::sync::mpsc;

use crate::counters::RunCounters;
use crate::query::QueryResult;

/// Significant figures kept by the latency histogram
const HISTOGRAM_SIGFIG: u8 = 3;

/// Totals that only the aggregator touches
///
/// Memory stays constant however long a continuous run lasts.
#[derive(Debug, Clone)]
pub struct Aggregate {
	pub total_duration: Duration,
	/// Per-query latency in microseconds
	pub latency_us: Histogram<u64>,
}

impl Aggregate {
	pub fn new() -> Result<Self, CreationError> {
		Ok(Aggregate {
			total_duration: Duration::ZERO,
			latency_us: Histogram::new(HISTOGRAM_SIGFIG)?,
		})
	}

	pub fn record(&mut self, duration: Duration) {
		self.total_duration += duration;
		let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
		// Auto-resizing histogram; out-of-range values clamp instead of failing
		self.latency_us.saturating_record(micros.max(1));
	}

	/// Number of recorded results.
	pub fn count(&self) -> u64 {
		self.latency_us.len()
	}
}

/// Consume the result stream until it closes.
///
/// This is the stream's only consumer. Returning is the "aggregation done"
/// signal, so every result pushed before the close has been counted.
pub async fn aggregate(
	mut results: mpsc::Receiver<QueryResult>,
	counters: Arc<RunCounters>,
	mut aggregate: Aggregate,
) -> Aggregate {
	while let Some(result) = results.recv().await {
		aggregate.record(result.duration);
		counters.record_result(result.success);
	}
	tracing::debug!(results = aggregate.count(), "result stream closed");
	aggregate
}
