use std::time::Duration;

use crate::aggregator::Aggregate;
use crate::counters::CounterSnapshot;

/// Final numbers of a run, computed once after the drain
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
	/// Tokens handed to the work queue
	pub issued: u64,
	/// Results aggregated; never more than `issued`
	pub total: u64,
	pub succeeded: u64,
	pub failed: u64,
	/// Percentage in [0, 100]; 0 when nothing completed
	pub success_rate: f64,
	pub elapsed: Duration,
	/// None when nothing completed
	pub mean: Option<Duration>,
	pub p50_ms: Option<f64>,
	pub p95_ms: Option<f64>,
	pub stddev_ms: Option<f64>,
	pub queries_per_second: f64,
}

impl RunStatistics {
	/// Derive statistics from the final counters and aggregate.
	///
	/// Every ratio is guarded, so an empty run yields zeros and `None`s.
	pub fn compute(counters: CounterSnapshot, aggregate: &Aggregate, elapsed: Duration) -> Self {
		let total = counters.completed;
		let succeeded = counters.succeeded.min(total);

		let success_rate = if total > 0 {
			(succeeded as f64 / total as f64) * 100.0
		} else {
			0.0
		};
		let mean = if total > 0 {
			Some(Duration::from_secs_f64(
				aggregate.total_duration.as_secs_f64() / total as f64,
			))
		} else {
			None
		};
		let secs = elapsed.as_secs_f64();
		let queries_per_second = if total > 0 && secs > 0.0 {
			total as f64 / secs
		} else {
			0.0
		};

		let latency = &aggregate.latency_us;
		let (p50_ms, p95_ms, stddev_ms) = if latency.is_empty() {
			(None, None, None)
		} else {
			(
				Some(latency.value_at_quantile(0.50) as f64 / 1000.0),
				Some(latency.value_at_quantile(0.95) as f64 / 1000.0),
				Some(latency.stdev() / 1000.0),
			)
		};

		RunStatistics {
			issued: counters.produced,
			total,
			succeeded,
			failed: total - succeeded,
			success_rate,
			elapsed,
			mean,
			p50_ms,
			p95_ms,
			stddev_ms,
			queries_per_second,
		}
	}

	/// Failure share in percent, the complement of `success_rate`.
	pub fn failure_rate(&self) -> f64 {
		if self.total > 0 {
			100.0 - self.success_rate
		} else {
			0.0
		}
	}
}
