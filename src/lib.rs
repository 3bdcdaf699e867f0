//! # rangebench - Range Query Latency Benchmarking
//!
//! Replays a file of `(entity, window start, window end)` tasks against a
//! time-series store and reports how long the range queries took.
//!
//! ## Features
//!
//! - **Partitioned worker pool**: every task for an entity lands on the same
//!   worker, so per-entity submission order is preserved
//! - **Bounded queues**: dispatch applies backpressure instead of buffering the
//!   whole input
//! - **Fan-in aggregation**: one aggregator collects results and computes min,
//!   median, mean and max query latency
//! - **Fail fast**: the first failed query cancels the run
//!
//! ## Quick Start
//!
//! ```bash
//! # Check how the tasks spread across workers
//! rangebench run query_params.csv --dry-run
//!
//! # Run against a database
//! rangebench run query_params.csv --database-url postgres://localhost/homework
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod parallel;
pub mod query;
pub mod report;
pub mod task;

pub use cli::{Cli, Output};
pub use config::BenchConfig;

/// Result type alias for rangebench operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
