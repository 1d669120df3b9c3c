//! `PostgreSQL`-backed store for the webhook delivery retry state machine
//! (spec §4.6, [`composable_rust_core::delivery`]).
//!
//! Every service that emits outbound webhooks (link click notifications,
//! stream alerts, stock-threshold callbacks) appends a [`Delivery`] row here
//! instead of keeping retry state in memory, so the retry-loop reconciler
//! survives a process restart mid-backoff. Grounded on the Dead Letter
//! Queue's shape in the teacher repository: a row-per-failure ledger keyed
//! by a status column, generalized here to also track in-flight attempts
//! rather than only terminal failures.
//!
//! # Example
//!
//! ```no_run
//! use composable_rust_postgres::DeliveryStore;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let store = DeliveryStore::new(pool);
//! let due = store.list_due(100).await?;
//! println!("deliveries due for a retry attempt: {}", due.len());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use composable_rust_core::delivery::{Delivery, DeliveryStatus};
use sqlx::{PgPool, Row};
use thiserror::Error;

/// Errors from [`DeliveryStore`] operations.
#[derive(Debug, Error)]
pub enum DeliveryStoreError {
    /// The underlying query failed.
    #[error("delivery store query failed: {0}")]
    Database(String),
    /// A row's `status` column held a value [`DeliveryStatus::parse`] rejected.
    #[error("corrupt delivery status in database: {0}")]
    CorruptStatus(String),
}

/// `PostgreSQL`-backed store for [`Delivery`] rows, keyed by the
/// delivery's own id.
pub struct DeliveryStore {
    pool: PgPool,
}

impl DeliveryStore {
    /// Create a new store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run this crate's migrations (creates the `deliveries` table).
    ///
    /// # Errors
    ///
    /// Returns an error if the migration run fails.
    pub async fn migrate(&self) -> Result<(), DeliveryStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DeliveryStoreError::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Insert a new delivery row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert(&self, delivery: &Delivery) -> Result<(), DeliveryStoreError> {
        sqlx::query(
            r"
            INSERT INTO deliveries (
                id, target_url, payload, status, attempt_count, max_attempts,
                next_attempt_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&delivery.id)
        .bind(&delivery.target_url)
        .bind(&delivery.payload)
        .bind(delivery.status.as_str())
        .bind(i64::from(delivery.attempt_count))
        .bind(i64::from(delivery.max_attempts))
        .bind(delivery.next_attempt_at)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DeliveryStoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// List deliveries whose `next_attempt_at` has passed and are not yet
    /// terminal, oldest first, capped at `limit` rows for one reconciler
    /// tick (spec §4.5: reconcilers must page through work, not load it all
    /// into memory at once).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored status is corrupt.
    pub async fn list_due(&self, limit: i64) -> Result<Vec<Delivery>, DeliveryStoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, target_url, payload, status, attempt_count, max_attempts,
                   next_attempt_at, created_at, updated_at
            FROM deliveries
            WHERE status IN ('pending', 'failed_retry')
              AND (next_attempt_at IS NULL OR next_attempt_at <= NOW())
            ORDER BY created_at ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DeliveryStoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_delivery).collect()
    }

    /// Persist a delivery's mutated state after a reconciler tick acted on
    /// it (`begin_attempt`, `mark_delivered`, `mark_failed_retry`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update(&self, delivery: &Delivery) -> Result<(), DeliveryStoreError> {
        sqlx::query(
            r"
            UPDATE deliveries
            SET status = $1, attempt_count = $2, next_attempt_at = $3, updated_at = $4
            WHERE id = $5
            ",
        )
        .bind(delivery.status.as_str())
        .bind(i64::from(delivery.attempt_count))
        .bind(delivery.next_attempt_at)
        .bind(delivery.updated_at)
        .bind(&delivery.id)
        .execute(&self.pool)
        .await
        .map_err(|e| DeliveryStoreError::Database(e.to_string()))?;

        tracing::info!(delivery_id = %delivery.id, status = delivery.status.as_str(), "delivery state updated");

        Ok(())
    }

    /// Count deliveries that have exhausted retries, for dashboards and
    /// health checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_failed_final(&self) -> Result<i64, DeliveryStoreError> {
        let (count,): (i64,) = sqlx::query_as(
            r"SELECT COUNT(*) FROM deliveries WHERE status = 'failed_final'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DeliveryStoreError::Database(e.to_string()))?;

        Ok(count)
    }

    fn row_to_delivery(row: &sqlx::postgres::PgRow) -> Result<Delivery, DeliveryStoreError> {
        let status_str: String = row.get("status");
        let status = DeliveryStatus::parse(&status_str).map_err(DeliveryStoreError::CorruptStatus)?;

        let created_at: DateTime<Utc> = row.get("created_at");
        let updated_at: DateTime<Utc> = row.get("updated_at");
        let attempt_count_raw: i64 = row.get("attempt_count");
        let max_attempts_raw: i64 = row.get("max_attempts");
        let attempt_count = u32::try_from(attempt_count_raw).unwrap_or(u32::MAX);
        let max_attempts = u32::try_from(max_attempts_raw).unwrap_or(u32::MAX);

        Ok(Delivery {
            id: row.get("id"),
            target_url: row.get("target_url"),
            payload: row.get("payload"),
            status,
            attempt_count,
            max_attempts,
            next_attempt_at: row.get("next_attempt_at"),
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn delivery_status_roundtrip() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::InFlight,
            DeliveryStatus::Delivered,
            DeliveryStatus::FailedRetry,
            DeliveryStatus::FailedFinal,
        ] {
            let parsed = DeliveryStatus::parse(status.as_str()).expect("valid status should parse");
            assert_eq!(status, parsed);
        }
    }
}
