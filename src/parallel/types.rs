use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

use crate::error::TaskFailure;
use crate::task::{Sample, Task};

/// Item on a worker's inbound queue
#[derive(Debug)]
pub enum WorkerMessage {
    Task(Task),
    /// Sent once per worker after every task addressed to it
    Shutdown,
}

/// "Worker `worker_id` has drained its queue and will send nothing more"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationSignal {
    pub worker_id: usize,
}

/// What a worker reports for one task
pub type TaskOutcome = Result<TaskResult, TaskFailure>;

/// Minimum and maximum of the values observed in one or more windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// `None` when there are no samples
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        samples.iter().fold(None, |range, sample| {
            Some(match range {
                None => ValueRange {
                    min: sample.value,
                    max: sample.value,
                },
                Some(range) => range.include(sample.value),
            })
        })
    }

    fn include(self, value: f64) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    pub fn merge(self, other: ValueRange) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Result of executing one task's range query
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub entity_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub worker_id: usize,
    /// Wall-clock time of the range query call
    pub query_duration: Duration,
    pub sample_count: usize,
    /// Absent when the window held no samples
    pub value_range: Option<ValueRange>,
}

/// Per-task line of the report: the window, who ran it, how long it took
/// and the min/max observed inside it (`None` for an empty window)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub entity_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub worker_id: usize,
    #[serde(rename = "query_ms", serialize_with = "as_millis")]
    pub query_duration: Duration,
    pub sample_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl From<TaskResult> for TaskSummary {
    fn from(result: TaskResult) -> Self {
        Self {
            entity_id: result.entity_id,
            window_start: result.window_start,
            window_end: result.window_end,
            worker_id: result.worker_id,
            query_duration: result.query_duration,
            sample_count: result.sample_count,
            min: result.value_range.map(|range| range.min),
            max: result.value_range.map(|range| range.max),
        }
    }
}

/// Order statistics over all recorded query durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    #[serde(rename = "min_query_ms", serialize_with = "as_millis")]
    pub min_query_duration: Duration,
    #[serde(rename = "max_query_ms", serialize_with = "as_millis")]
    pub max_query_duration: Duration,
    #[serde(rename = "median_query_ms", serialize_with = "as_millis")]
    pub median_query_duration: Duration,
    #[serde(rename = "mean_query_ms", serialize_with = "as_millis")]
    pub mean_query_duration: Duration,
}

impl LatencySummary {
    /// Summarize durations already sorted ascending; `None` if there are none.
    ///
    /// The median of an even count is the mean of the two central elements.
    pub fn from_sorted(sorted: &[Duration], total: Duration) -> Option<Self> {
        let count = sorted.len();
        let (first, last) = (*sorted.first()?, *sorted.last()?);

        let mid = count / 2;
        let median = if count % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / 2
        };

        let mean_nanos = total.as_nanos() / count as u128;
        let mean = Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX));

        Some(Self {
            min_query_duration: first,
            max_query_duration: last,
            median_query_duration: median,
            mean_query_duration: mean,
        })
    }
}

/// Final statistics for a run, produced once after every worker terminated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub task_count: u64,
    pub worker_count: usize,
    #[serde(rename = "total_process_ms", serialize_with = "as_millis")]
    pub total_process_duration: Duration,
    #[serde(rename = "total_query_ms", serialize_with = "as_millis")]
    pub total_query_duration: Duration,
    /// `None` when no task was executed
    pub latency: Option<LatencySummary>,
    /// Global range over every non-empty window
    pub value_range: Option<ValueRange>,
    /// Tasks whose window held no samples
    pub empty_windows: u64,
    /// One entry per executed task, in completion order. Tasks of one entity
    /// keep their submission order.
    pub tasks: Vec<TaskSummary>,
}

impl AggregateReport {
    pub fn has_data(&self) -> bool {
        self.latency.is_some()
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}
