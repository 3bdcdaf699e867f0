use crossbeam::channel::{Receiver, Sender, never, select};
use std::time::{Duration, Instant};

use super::types::{AggregateReport, LatencySummary, TaskOutcome, TaskResult, TaskSummary, TerminationSignal, ValueRange};
use crate::error::TaskFailure;

/// Single fan-in consumer of every task outcome and termination signal.
///
/// Sole owner of the running statistics; nothing else reads or writes them.
pub struct Aggregator {
    worker_count: usize,
    task_count: u64,
    total_query_duration: Duration,
    durations: Vec<Duration>,
    value_range: Option<ValueRange>,
    empty_windows: u64,
    tasks: Vec<TaskSummary>,
    failure: Option<TaskFailure>,
}

impl Aggregator {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            task_count: 0,
            total_query_duration: Duration::ZERO,
            durations: Vec::new(),
            value_range: None,
            empty_windows: 0,
            tasks: Vec::new(),
            failure: None,
        }
    }

    /// Consume outcomes until `expected_terminations` workers have terminated,
    /// then compute the report exactly once.
    ///
    /// The first task failure cancels the run by dropping `cancel`; workers
    /// still drain and terminate, and the failure is returned instead of a
    /// report.
    pub fn run(
        mut self,
        results: Receiver<TaskOutcome>,
        terminations: Receiver<TerminationSignal>,
        expected_terminations: usize,
        cancel: Sender<()>,
    ) -> Result<AggregateReport, TaskFailure> {
        let started = Instant::now();
        let mut cancel = Some(cancel);
        let mut outstanding = expected_terminations;
        let closed = never();
        let mut results_open = true;

        while outstanding > 0 {
            // Every worker gone: stop polling the disconnected result channel
            let results_rx = if results_open { &results } else { &closed };

            select! {
                recv(results_rx) -> outcome => match outcome {
                    Ok(outcome) => self.handle(outcome, &mut cancel),
                    Err(_) => results_open = false,
                },
                recv(terminations) -> signal => match signal {
                    Ok(TerminationSignal { worker_id }) => {
                        outstanding -= 1;
                        tracing::trace!(worker = worker_id, outstanding, "Termination received");
                    }
                    Err(_) => {
                        tracing::warn!(outstanding, "Termination channel closed early");
                        break;
                    }
                },
            }
        }

        // A worker sends all of its outcomes before its termination signal, so
        // any outcome not yet consumed is already queued.
        for outcome in results.try_iter() {
            self.handle(outcome, &mut cancel);
        }

        self.finish(started.elapsed())
    }

    fn handle(&mut self, outcome: TaskOutcome, cancel: &mut Option<Sender<()>>) {
        match outcome {
            Ok(result) => self.record(result),
            Err(failure) => {
                tracing::error!("{}", failure);
                if cancel.take().is_some() {
                    tracing::warn!("Cancelling run after query failure");
                }
                self.failure.get_or_insert(failure);
            }
        }
    }

    /// Fold one successful result into the running statistics
    pub fn record(&mut self, result: TaskResult) {
        self.task_count += 1;
        self.total_query_duration += result.query_duration;
        self.durations.push(result.query_duration);

        match result.value_range {
            Some(range) => {
                self.value_range = Some(match self.value_range {
                    Some(current) => current.merge(range),
                    None => range,
                });
            }
            None => {
                self.empty_windows += 1;
                tracing::trace!(entity = %result.entity_id, "Window held no samples");
            }
        }

        self.tasks.push(TaskSummary::from(result));
    }

    /// Compute the final report, or return the first recorded failure
    pub fn finish(mut self, total_process_duration: Duration) -> Result<AggregateReport, TaskFailure> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }

        self.durations.sort_unstable();
        let latency = LatencySummary::from_sorted(&self.durations, self.total_query_duration);

        Ok(AggregateReport {
            task_count: self.task_count,
            worker_count: self.worker_count,
            total_process_duration,
            total_query_duration: self.total_query_duration,
            latency,
            value_range: self.value_range,
            empty_windows: self.empty_windows,
            tasks: self.tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use chrono::Utc;
    use crossbeam::channel::{bounded, unbounded};

    fn result(ms: u64, range: Option<(f64, f64)>) -> TaskOutcome {
        let start = Utc::now();
        Ok(TaskResult {
            entity_id: "host_1".to_string(),
            window_start: start,
            window_end: start,
            worker_id: 0,
            query_duration: Duration::from_millis(ms),
            sample_count: usize::from(range.is_some()),
            value_range: range.map(|(min, max)| ValueRange { min, max }),
        })
    }

    fn failure(entity: &str) -> TaskOutcome {
        let now = Utc::now();
        Err(TaskFailure {
            entity_id: entity.to_string(),
            window_start: now,
            window_end: now,
            source: QueryError::Backend("boom".to_string()),
        })
    }

    /// Queue every outcome and then the termination signals before running
    fn run_with(outcomes: Vec<TaskOutcome>, workers: usize) -> (Result<AggregateReport, TaskFailure>, Receiver<()>) {
        let (result_tx, result_rx) = unbounded();
        let (term_tx, term_rx) = unbounded();
        let (cancel_tx, cancel_rx) = bounded(0);

        for outcome in outcomes {
            result_tx.send(outcome).unwrap();
        }
        for worker_id in 0..workers {
            term_tx.send(TerminationSignal { worker_id }).unwrap();
        }

        let report = Aggregator::new(workers).run(result_rx, term_rx, workers, cancel_tx);
        (report, cancel_rx)
    }

    #[test]
    fn test_report_statistics() {
        let (report, _) = run_with(
            vec![
                result(30, Some((4.0, 50.0))),
                result(10, Some((1.5, 20.0))),
                result(20, Some((7.0, 99.5))),
            ],
            2,
        );
        let report = report.unwrap();
        let latency = report.latency.unwrap();

        assert_eq!(report.task_count, 3);
        assert_eq!(report.worker_count, 2);
        assert_eq!(report.total_query_duration, Duration::from_millis(60));
        assert_eq!(latency.min_query_duration, Duration::from_millis(10));
        assert_eq!(latency.median_query_duration, Duration::from_millis(20));
        assert_eq!(latency.max_query_duration, Duration::from_millis(30));
        assert_eq!(latency.mean_query_duration, Duration::from_millis(20));
        assert_eq!(report.value_range, Some(ValueRange { min: 1.5, max: 99.5 }));
        assert_eq!(report.empty_windows, 0);
    }

    #[test]
    fn test_outcomes_queued_behind_terminations_are_counted() {
        // Terminations are queued first here; the drain after the loop must
        // still pick up every result.
        let (result_tx, result_rx) = unbounded();
        let (term_tx, term_rx) = unbounded();
        let (cancel_tx, _cancel_rx) = bounded(0);

        term_tx.send(TerminationSignal { worker_id: 0 }).unwrap();
        for ms in [10, 20, 30, 40] {
            result_tx.send(result(ms, None)).unwrap();
        }

        let report = Aggregator::new(1)
            .run(result_rx, term_rx, 1, cancel_tx)
            .unwrap();
        assert_eq!(report.task_count, 4);
        assert_eq!(
            report.latency.unwrap().median_query_duration,
            Duration::from_millis(25)
        );
    }

    #[test]
    fn test_no_tasks_reports_no_data() {
        let (report, _) = run_with(Vec::new(), 3);
        let report = report.unwrap();

        assert_eq!(report.task_count, 0);
        assert!(!report.has_data());
        assert!(report.latency.is_none());
        assert!(report.value_range.is_none());
    }

    #[test]
    fn test_empty_windows_do_not_touch_value_range() {
        let (report, _) = run_with(
            vec![
                result(5, None),
                result(6, Some((42.0, 43.0))),
                result(7, None),
            ],
            1,
        );
        let report = report.unwrap();

        assert_eq!(report.task_count, 3);
        assert_eq!(report.empty_windows, 2);
        assert_eq!(report.value_range, Some(ValueRange { min: 42.0, max: 43.0 }));
    }

    #[test]
    fn test_per_task_summaries_in_arrival_order() {
        let (report, _) = run_with(
            vec![
                result(5, None),
                result(6, Some((42.0, 43.0))),
                result(7, Some((1.0, 2.0))),
            ],
            2,
        );
        let report = report.unwrap();

        let durations: Vec<Duration> = report.tasks.iter().map(|t| t.query_duration).collect();
        assert_eq!(durations, vec![
            Duration::from_millis(5),
            Duration::from_millis(6),
            Duration::from_millis(7)
        ]);
        let ranges: Vec<(Option<f64>, Option<f64>)> = report.tasks.iter().map(|t| (t.min, t.max)).collect();
        assert_eq!(ranges, vec![(None, None), (Some(42.0), Some(43.0)), (Some(1.0), Some(2.0))]);
    }

    #[test]
    fn test_only_empty_windows_leave_range_absent() {
        let (report, _) = run_with(vec![result(5, None)], 1);
        let report = report.unwrap();
        assert_eq!(report.task_count, 1);
        assert!(report.value_range.is_none());
        assert!(report.has_data());
    }

    #[test]
    fn test_failure_cancels_run_and_is_returned() {
        let (report, cancel_rx) = run_with(
            vec![result(5, None), failure("host_bad"), failure("host_worse")],
            2,
        );

        let failure = report.unwrap_err();
        assert_eq!(failure.entity_id, "host_bad");
        assert!(cancel_rx.recv().is_err(), "cancel sender should be dropped");
    }
}
