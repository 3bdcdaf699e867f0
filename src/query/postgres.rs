use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::runtime::Handle;

use super::RangeQuery;
use crate::config::DatabaseConfig;
use crate::error::QueryError;
use crate::task::Sample;

/// Range queries against a PostgreSQL/TimescaleDB table.
///
/// Workers run on plain OS threads, so each call is driven to completion on
/// the Tokio runtime that created the pool, bounded by the configured
/// per-query timeout.
pub struct PgRangeQuery {
    pool: PgPool,
    runtime: Handle,
    sql: String,
    query_timeout: Duration,
}

impl PgRangeQuery {
    /// Build a connection pool sized for `worker_count` concurrent queries.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn connect(config: &DatabaseConfig, worker_count: usize) -> Result<Self, QueryError> {
        let max_connections = if config.max_connections == 0 {
            worker_count.max(1)
        } else {
            config.max_connections
        };

        let pool = PgPoolOptions::new()
            .max_connections(u32::try_from(max_connections).unwrap_or(u32::MAX))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!(
            table = %config.table,
            max_connections,
            "Connected to range query backend"
        );

        Ok(Self {
            pool,
            runtime: Handle::current(),
            sql: range_sql(config),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RangeQuery for PgRangeQuery {
    fn range_query(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, QueryError> {
        let fetched = self.runtime.block_on(async {
            let fetch = sqlx::query_as::<_, (DateTime<Utc>, f64)>(&self.sql)
                .bind(entity_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool);
            tokio::time::timeout(self.query_timeout, fetch).await
        });

        let rows = fetched.map_err(|_| QueryError::Timeout(self.query_timeout))??;
        Ok(rows
            .into_iter()
            .map(|(timestamp, value)| Sample { timestamp, value })
            .collect())
    }
}

/// Identifiers are validated by `DatabaseConfig::validate` before they get here
fn range_sql(config: &DatabaseConfig) -> String {
    format!(
        "SELECT {time}::timestamptz, {value}::double precision FROM {table} \
         WHERE {entity} = $1 AND {time} BETWEEN $2 AND $3 ORDER BY {time}",
        time = config.time_column,
        value = config.value_column,
        table = config.table,
        entity = config.entity_column,
    )
}
