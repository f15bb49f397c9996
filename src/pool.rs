use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::query::{QueryExecutor, QueryResult};

/// Marker for "perform one query attempt"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkToken;

/// What the pool reports once every worker has exited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
	pub workers: usize,
	pub processed: u64,
}

/// Fixed-size set of worker loops sharing one work queue and one result stream
pub struct WorkerPool {
	supervisor: JoinHandle<PoolSummary>,
}

impl WorkerPool {
	/// Spawn `size` workers.
	///
	/// The result stream closes only after every worker has returned: the
	/// supervisor holds its own sender and drops it after the last join.
	pub fn spawn<E: QueryExecutor>(
		size: usize,
		executor: Arc<E>,
		work: async_channel::Receiver<WorkToken>,
		results: mpsc::Sender<QueryResult>,
		cancel: CancellationToken,
	) -> Self {
		let mut workers = JoinSet::new();
		for id in 0..size {
			workers.spawn(worker_loop(
				id,
				executor.clone(),
				work.clone(),
				results.clone(),
				cancel.clone(),
			));
		}
		tracing::debug!(workers = size, "worker pool started");

		let supervisor = tokio::spawn(async move {
			let mut summary = PoolSummary::default();
			while let Some(joined) = workers.join_next().await {
				match joined {
					Ok(processed) => summary.processed += processed,
					Err(e) => tracing::error!("worker task failed: {}", e),
				}
				summary.workers += 1;
			}
			drop(results);
			tracing::debug!(
				workers = summary.workers,
				processed = summary.processed,
				"worker pool finished"
			);
			summary
		});

		WorkerPool { supervisor }
	}

	/// Wait until all workers have exited and the result stream is closed.
	pub async fn finished(self) -> Result<PoolSummary, JoinError> {
		self.supervisor.await
	}
}

/// Take tokens until the queue is closed or the run is cancelled.
///
/// An attempt already in flight is finished and its result pushed before
/// cancellation is looked at again.
async fn worker_loop<E: QueryExecutor>(
	id: usize,
	executor: Arc<E>,
	work: async_channel::Receiver<WorkToken>,
	results: mpsc::Sender<QueryResult>,
	cancel: CancellationToken,
) -> u64 {
	let mut processed = 0u64;
	loop {
		tokio::select! {
			() = cancel.cancelled() => {
				tracing::trace!(worker = id, "cancelled");
				break;
			}
			token = work.recv() => {
				if token.is_err() {
					tracing::trace!(worker = id, "work queue closed");
					break;
				}
				let result = executor.execute().await;
				processed += 1;
				if results.send(result).await.is_err() {
					tracing::warn!(worker = id, "result stream closed, dropping result");
					break;
				}
			}
		}
	}
	processed
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU64, Ordering};
	use std::time::Duration;

	/// Counts calls and answers instantly
	#[derive(Default)]
	struct CountingExecutor {
		calls: AtomicU64,
	}

	impl QueryExecutor for CountingExecutor {
		async fn execute(&self) -> QueryResult {
			self.calls.fetch_add(1, Ordering::SeqCst);
			tokio::task::yield_now().await;
			QueryResult { duration: Duration::from_millis(1), success: true }
		}
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_each_token_processed_once() {
		let executor = Arc::new(CountingExecutor::default());
		let (work_tx, work_rx) = async_channel::bounded(1);
		let (result_tx, mut result_rx) = mpsc::channel(4);
		let pool = WorkerPool::spawn(
			4, executor.clone(), work_rx, result_tx, CancellationToken::new(),
		);

		let feeder = tokio::spawn(async move {
			for _ in 0..50 {
				work_tx.send(WorkToken).await.unwrap();
			}
			work_tx.close();
		});

		let mut received = 0;
		while result_rx.recv().await.is_some() {
			received += 1;
		}
		feeder.await.unwrap();

		let summary = pool.finished().await.unwrap();
		assert_eq!(received, 50);
		assert_eq!(summary, PoolSummary { workers: 4, processed: 50 });
		assert_eq!(executor.calls.load(Ordering::SeqCst), 50);
	}

	#[tokio::test]
	async fn test_cancel_stops_idle_workers() {
		let executor = Arc::new(CountingExecutor::default());
		// Queue stays open and empty: only cancellation can end the workers
		let (_work_tx, work_rx) = async_channel::bounded::<WorkToken>(1);
		let (result_tx, mut result_rx) = mpsc::channel(3);
		let cancel = CancellationToken::new();
		let pool = WorkerPool::spawn(3, executor, work_rx, result_tx, cancel.clone());

		cancel.cancel();
		let summary = tokio::time::timeout(Duration::from_secs(2), pool.finished())
			.await
			.expect("pool did not stop after cancellation")
			.unwrap();
		assert_eq!(summary, PoolSummary { workers: 3, processed: 0 });
		// Stream is closed once the barrier has passed
		assert!(result_rx.recv().await.is_none());
	}

	#[tokio::test]
	async fn test_closed_queue_ends_pool() {
		let executor = Arc::new(CountingExecutor::default());
		let (work_tx, work_rx) = async_channel::bounded::<WorkToken>(1);
		work_tx.close();
		let (result_tx, _result_rx) = mpsc::channel(2);
		let pool = WorkerPool::spawn(2, executor, work_rx, result_tx, CancellationToken::new());

		let summary = pool.finished().await.unwrap();
		assert_eq!(summary.workers, 2);
		assert_eq!(summary.processed, 0);
	}
}
