//! Partitioned parallel execution engine
//!
//! This module runs a batch of range-query tasks on a fixed-size pool of worker
//! threads and folds their outcomes into a single [`AggregateReport`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  partition(entity)  ┌──────────┐   TaskOutcome    ┌──────────────┐
//! │  Dispatcher  │────────────────────▶│ Worker 0 │─────────────────▶│              │
//! │              │     bounded queue   ├──────────┤                  │  Aggregator  │
//! │ (caller      │────────────────────▶│ Worker 1 │─────────────────▶│              │
//! │  thread)     │         ...         ├──────────┤ TerminationSignal│ (sole owner  │
//! │              │────────────────────▶│ Worker N │─────────────────▶│  of stats)   │
//! └──────────────┘  Shutdown × N       └──────────┘                  └──────────────┘
//! ```
//!
//! - **Partitioner**: hashes the entity id onto a slot, so all tasks for one
//!   entity go to one worker and execute in submission order.
//! - **Worker**: drains its own bounded queue, one range query per task, and
//!   emits exactly one termination signal on exit.
//! - **Dispatcher**: routes tasks, blocking on a full queue (backpressure is
//!   per slot), then sends one shutdown marker to every queue.
//! - **Aggregator**: the only consumer of outcomes; finishes once every worker
//!   has terminated.
//!
//! All coordination is message passing over crossbeam channels. A query
//! failure cancels the run by disconnecting a cancellation channel: workers
//! stop querying but still drain to their shutdown marker, so nothing blocks.
//!
//! # Example
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use rangebench::error::QueryError;
//! use rangebench::parallel::{Engine, EngineOptions};
//! use rangebench::query::RangeQuery;
//! use rangebench::task::{Sample, Task};
//!
//! struct Constant;
//!
//! impl RangeQuery for Constant {
//!     fn range_query(&self, _: &str, start: DateTime<Utc>, _: DateTime<Utc>)
//!         -> Result<Vec<Sample>, QueryError>
//!     {
//!         Ok(vec![Sample { timestamp: start, value: 42.0 }])
//!     }
//! }
//!
//! let now = Utc::now();
//! let tasks = vec![Ok(Task::new("host_1", now, now)), Ok(Task::new("host_2", now, now))];
//!
//! let engine = Engine::new(EngineOptions { worker_count: 2, queue_capacity: 4 }, &Constant);
//! let report = engine.run(tasks).unwrap();
//! assert_eq!(report.task_count, 2);
//! ```

pub mod aggregator;
mod dispatcher;
pub mod engine;
pub mod partition;
pub mod types;
mod worker;

// Re-export main types for easier access
pub use aggregator::Aggregator;
pub use engine::{Engine, EngineOptions};
pub use partition::{SlotLoad, partition, slot_loads};
pub use types::{
    AggregateReport, LatencySummary, TaskOutcome, TaskResult, TaskSummary, TerminationSignal, ValueRange, WorkerMessage,
};
