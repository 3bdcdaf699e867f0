//! Typed errors for the task source, the range-query backend and the engine.
//!
//! The CLI layer wraps these in `anyhow` with context; the engine itself only
//! ever returns [`RunError`].

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// A malformed or unreadable task record
#[derive(Debug, Error)]
pub enum InputError {
    #[error("line {line}: expected 3 fields (entity, start, end), found {found}")]
    FieldCount { line: u64, found: usize },

    #[error("line {line}: entity id is empty")]
    EmptyEntity { line: u64 },

    #[error("line {line}: invalid timestamp '{value}': {source}")]
    Timestamp {
        line: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("line {line}: window start {start} is after window end {end}")]
    InvertedWindow {
        line: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("line {line}: failed to read task input: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// Failure of a single range query against the store
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Backend(String),
}

/// A task whose range query failed, with enough context to identify it
#[derive(Debug, Error)]
#[error("query for '{entity_id}' in [{window_start}, {window_end}] failed: {source}")]
pub struct TaskFailure {
    pub entity_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[source]
    pub source: QueryError,
}

/// Why a run ended without a report
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid task input: {0}")]
    Input(#[from] InputError),

    #[error(transparent)]
    Query(#[from] TaskFailure),

    #[error("a worker thread panicked during the run")]
    WorkerPanic,
}
