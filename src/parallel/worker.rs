use crossbeam::channel::{Receiver, Sender, TryRecvError};
use std::time::Instant;

use super::types::{TaskOutcome, TaskResult, TerminationSignal, ValueRange, WorkerMessage};
use crate::error::TaskFailure;
use crate::query::RangeQuery;
use crate::task::Task;

/// One execution lane bound to a single partition slot
pub(crate) struct Worker<'q, Q: ?Sized> {
    worker_id: usize,
    inbound: Receiver<WorkerMessage>,
    results: Sender<TaskOutcome>,
    terminations: Sender<TerminationSignal>,
    /// Never carries messages; disconnects when the run is cancelled
    cancel: Receiver<()>,
    query: &'q Q,
}

/// Emits the worker's termination signal when dropped, so it is sent exactly
/// once on every exit path, including unwinding.
struct TerminationGuard {
    worker_id: usize,
    terminations: Sender<TerminationSignal>,
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        tracing::debug!(worker = self.worker_id, "Worker terminated");
        // The aggregator only stops listening once every worker has terminated
        let _ = self.terminations.send(TerminationSignal {
            worker_id: self.worker_id,
        });
    }
}

impl<'q, Q: RangeQuery + ?Sized> Worker<'q, Q> {
    pub(crate) fn new(
        worker_id: usize,
        inbound: Receiver<WorkerMessage>,
        results: Sender<TaskOutcome>,
        terminations: Sender<TerminationSignal>,
        cancel: Receiver<()>,
        query: &'q Q,
    ) -> Self {
        Self {
            worker_id,
            inbound,
            results,
            terminations,
            cancel,
            query,
        }
    }

    /// Process the inbound queue in arrival order until the shutdown marker.
    ///
    /// Once the run is cancelled the remaining tasks are drained without
    /// querying so the dispatcher never blocks on this queue.
    pub(crate) fn run(self) {
        let _termination = TerminationGuard {
            worker_id: self.worker_id,
            terminations: self.terminations.clone(),
        };
        let mut executed = 0usize;
        let mut skipped = 0usize;

        while let Ok(message) = self.inbound.recv() {
            let task = match message {
                WorkerMessage::Shutdown => break,
                WorkerMessage::Task(task) => task,
            };

            if self.is_cancelled() {
                skipped += 1;
                continue;
            }

            let outcome = self.execute(task);
            executed += 1;
            if self.results.send(outcome).is_err() {
                break; // Aggregator dropped
            }
        }

        tracing::debug!(
            worker = self.worker_id,
            executed,
            skipped,
            "Worker drained its queue"
        );
    }

    fn is_cancelled(&self) -> bool {
        matches!(self.cancel.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Run exactly one range query for `task` and time it
    fn execute(&self, task: Task) -> TaskOutcome {
        let started = Instant::now();
        let samples = self
            .query
            .range_query(&task.entity_id, task.window_start, task.window_end);
        let query_duration = started.elapsed();

        match samples {
            Ok(samples) => {
                tracing::debug!(
                    worker = self.worker_id,
                    entity = %task.entity_id,
                    samples = samples.len(),
                    elapsed_ms = query_duration.as_millis() as u64,
                    "Range query complete"
                );
                Ok(TaskResult {
                    value_range: ValueRange::from_samples(&samples),
                    sample_count: samples.len(),
                    entity_id: task.entity_id,
                    window_start: task.window_start,
                    window_end: task.window_end,
                    worker_id: self.worker_id,
                    query_duration,
                })
            }
            Err(source) => Err(TaskFailure {
                entity_id: task.entity_id,
                window_start: task.window_start,
                window_end: task.window_end,
                source,
            }),
        }
    }
}
