//! Range-query tasks and the CSV source that produces them

pub mod reader;

use chrono::{DateTime, Utc};

pub use reader::TaskReader;

/// One range-query request: an entity and the time window to read for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub entity_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl Task {
    pub fn new(
        entity_id: impl Into<String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            window_start,
            window_end,
        }
    }
}

/// A single `(timestamp, value)` row returned by a range query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}
