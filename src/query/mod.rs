//! Range-query capability used by the workers
//!
//! The engine only needs something that can answer "which samples did this
//! entity produce inside this window". [`PgRangeQuery`] answers it from a
//! PostgreSQL/TimescaleDB table; tests plug in in-memory fakes.

pub mod postgres;

use chrono::{DateTime, Utc};

use crate::error::QueryError;
use crate::task::Sample;

pub use postgres::PgRangeQuery;

/// Executes one range query per call.
///
/// Implementations are shared by reference across all worker threads and
/// must tolerate concurrent calls without external coordination.
pub trait RangeQuery: Send + Sync {
    fn range_query(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, QueryError>;
}
