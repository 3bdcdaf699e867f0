use crossbeam::channel::bounded;

use super::aggregator::Aggregator;
use super::dispatcher::Dispatcher;
use super::types::{AggregateReport, TaskOutcome, TerminationSignal, WorkerMessage};
use super::worker::Worker;
use crate::error::{InputError, RunError};
use crate::query::RangeQuery;
use crate::task::Task;

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Parallel execution lanes (at least 1)
    pub worker_count: usize,
    /// Tasks buffered per worker before dispatch blocks (at least 1)
    pub queue_capacity: usize,
}

/// Partitioned dispatch, parallel execution and fan-in aggregation
pub struct Engine<'q, Q: ?Sized> {
    options: EngineOptions,
    query: &'q Q,
}

impl<'q, Q: RangeQuery + ?Sized> Engine<'q, Q> {
    pub fn new(options: EngineOptions, query: &'q Q) -> Self {
        let options = EngineOptions {
            worker_count: options.worker_count.max(1),
            queue_capacity: options.queue_capacity.max(1),
        };
        Self { options, query }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Execute every task and return the aggregate report.
    ///
    /// The task source is consumed on the calling thread, which acts as the
    /// dispatcher. Workers and the aggregator run on scoped threads and have
    /// all terminated by the time this returns. Input errors take precedence
    /// over query failures; no partial report is ever returned.
    pub fn run<I>(&self, tasks: I) -> Result<AggregateReport, RunError>
    where
        I: IntoIterator<Item = Result<Task, InputError>>,
    {
        let EngineOptions {
            worker_count,
            queue_capacity,
        } = self.options;
        tracing::info!(worker_count, queue_capacity, "Starting run");

        let (result_tx, result_rx) = bounded::<TaskOutcome>(worker_count * queue_capacity);
        let (term_tx, term_rx) = bounded::<TerminationSignal>(worker_count);
        let (cancel_tx, cancel_rx) = bounded::<()>(0);

        let (dispatched, report) = crossbeam::thread::scope(|s| {
            let aggregator = s.spawn(move |_| {
                Aggregator::new(worker_count).run(result_rx, term_rx, worker_count, cancel_tx)
            });

            let mut queues = Vec::with_capacity(worker_count);
            for worker_id in 0..worker_count {
                let (queue_tx, queue_rx) = bounded::<WorkerMessage>(queue_capacity);
                queues.push(queue_tx);

                let worker = Worker::new(
                    worker_id,
                    queue_rx,
                    result_tx.clone(),
                    term_tx.clone(),
                    cancel_rx.clone(),
                    self.query,
                );
                s.spawn(move |_| worker.run());
            }

            // Only workers may hold these from here on
            drop(result_tx);
            drop(term_tx);

            let dispatched = Dispatcher::new(queues, cancel_rx).dispatch(tasks);
            (dispatched, aggregator.join())
        })
        .map_err(|_| RunError::WorkerPanic)?;

        let dispatched = dispatched?;
        let report = report.map_err(|_| RunError::WorkerPanic)??;

        tracing::info!(
            dispatched,
            executed = report.task_count,
            elapsed_ms = report.total_process_duration.as_millis() as u64,
            "Run complete"
        );
        Ok(report)
    }
}
