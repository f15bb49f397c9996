use std::sync::atomic::{AtomicU64, Ordering};

/// Run-scoped counters shared between the producer, the aggregator and
/// the coordinator
#[derive(Debug, Default)]
pub struct RunCounters {
	produced: AtomicU64,
	completed: AtomicU64,
	succeeded: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
	pub produced: u64,
	pub completed: u64,
	pub succeeded: u64,
}

impl RunCounters {
	/// Count one token handed to the work queue, returning the new total.
	pub fn record_produced(&self) -> u64 {
		self.produced.fetch_add(1, Ordering::AcqRel) + 1
	}

	/// Count one aggregated result.
	pub fn record_result(&self, success: bool) {
		self.completed.fetch_add(1, Ordering::AcqRel);
		if success {
			self.succeeded.fetch_add(1, Ordering::AcqRel);
		}
	}

	pub fn produced(&self) -> u64 {
		self.produced.load(Ordering::Acquire)
	}

	pub fn snapshot(&self) -> CounterSnapshot {
		CounterSnapshot {
			produced: self.produced.load(Ordering::Acquire),
			completed: self.completed.load(Ordering::Acquire),
			succeeded: self.succeeded.load(Ordering::Acquire),
		}
	}
}
