use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::QueryLimit;
use crate::counters::RunCounters;
use crate::output;
use crate::pool::WorkToken;

/// Progress is printed every this many tokens
pub const PROGRESS_INTERVAL: u64 = 10;

/// Feed work tokens into the queue until the limit is reached or the run
/// is cancelled, then close the queue.
///
/// Each push races against cancellation; cancellation wins when both are
/// ready. Returns the number of tokens produced.
pub async fn produce(
	limit: QueryLimit,
	queue: async_channel::Sender<WorkToken>,
	counters: Arc<RunCounters>,
	cancel: CancellationToken,
) -> u64 {
	let mut produced = counters.produced();
	while limit.permits(produced) {
		tokio::select! {
			biased;
			() = cancel.cancelled() => break,
			sent = queue.send(WorkToken) => {
				if sent.is_err() {
					tracing::debug!("work queue closed before the limit was reached");
					break;
				}
			}
		}

		produced = counters.record_produced();
		if produced % PROGRESS_INTERVAL == 0 || limit.is_final(produced) {
			output::print_progress(produced, limit);
		}
	}

	queue.close();
	tracing::debug!(produced, cancelled = cancel.is_cancelled(), "producer finished");
	produced
}
