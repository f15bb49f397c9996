use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregator::{aggregate, Aggregate};
use crate::config::RunConfig;
use crate::counters::RunCounters;
use crate::output;
use crate::pool::{PoolSummary, WorkerPool};
use crate::producer::produce;
use crate::query::QueryExecutor;
use crate::stats::RunStatistics;

/// A token waits here until a worker is free
const WORK_QUEUE_CAPACITY: usize = 1;

/// Coordinator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
	Running,
	Draining,
	Reporting,
	Terminated,
}

/// Which side of the completion/interrupt race won
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
	Completed,
	Interrupted,
}

/// Everything a finished run hands back to the caller
#[derive(Debug, Clone)]
pub struct RunReport {
	pub outcome: RunOutcome,
	pub statistics: RunStatistics,
	pub pool: PoolSummary,
}

fn enter(phase: &mut RunPhase, next: RunPhase) {
	let from = *phase;
	tracing::debug!(from = ?from, to = ?next, "run phase changed");
	*phase = next;
}

/// Run the probe until the query limit is reached or `interrupt` resolves.
///
/// Spawns the worker pool, the producer and the aggregator, then races
/// aggregation against the interrupt. An interrupt cancels production and
/// idle workers; in-flight attempts still report before the drain ends.
/// The producer, the pool and the aggregator are all awaited before the
/// statistics are computed and printed.
///
/// Only a histogram that cannot be allocated or a panicked internal task
/// makes this return an error.
pub async fn run_probe<E, I>(
	config: Arc<RunConfig>,
	executor: E,
	interrupt: I,
) -> Result<RunReport>
where
	E: QueryExecutor,
	I: Future<Output = ()>,
{
	let mut phase = RunPhase::Running;
	let totals = Aggregate::new().context("failed to create latency histogram")?;
	let cancel = CancellationToken::new();
	let counters = Arc::new(RunCounters::default());

	let (work_tx, work_rx) = async_channel::bounded(WORK_QUEUE_CAPACITY);
	let (result_tx, result_rx) = mpsc::channel(config.concurrency);

	let pool = WorkerPool::spawn(
		config.concurrency,
		Arc::new(executor),
		work_rx,
		result_tx,
		cancel.clone(),
	);

	let start = Instant::now();
	let producer = tokio::spawn(produce(
		config.limit,
		work_tx,
		counters.clone(),
		cancel.clone(),
	));
	let mut aggregator = tokio::spawn(aggregate(result_rx, counters.clone(), totals));

	tokio::pin!(interrupt);
	let (outcome, joined) = tokio::select! {
		joined = &mut aggregator => (RunOutcome::Completed, Some(joined)),
		() = &mut interrupt => (RunOutcome::Interrupted, None),
	};
	output::print_shutdown_notice(outcome);

	let joined = match joined {
		Some(joined) => joined,
		None => {
			cancel.cancel();
			enter(&mut phase, RunPhase::Draining);
			aggregator.await
		}
	};
	let aggregate = joined.context("result aggregator task failed")?;
	let produced = producer.await.context("work producer task failed")?;
	let pool_summary = pool.finished().await.context("worker pool supervisor failed")?;
	let elapsed = start.elapsed();

	enter(&mut phase, RunPhase::Reporting);
	let statistics = RunStatistics::compute(counters.snapshot(), &aggregate, elapsed);
	tracing::info!(
		outcome = ?outcome,
		produced,
		completed = statistics.total,
		succeeded = statistics.succeeded,
		workers = pool_summary.workers,
		"run finished"
	);
	output::print_report(&config, &statistics);

	enter(&mut phase, RunPhase::Terminated);
	Ok(RunReport {
		outcome,
		statistics,
		pool: pool_summary,
	})
}
