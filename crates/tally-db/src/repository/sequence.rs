//! # Sequence Repository
//!
//! Durable per-series, per-period counters.
//!
//! ## Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  reserve_next("purchase", 2024)                         │
//! │                                                                         │
//! │  INSERT INTO code_sequences (series, period, value)                     │
//! │  VALUES ('purchase', '2024', 1)                                         │
//! │  ON CONFLICT (series, period) DO UPDATE SET value = value + 1          │
//! │  RETURNING value                                                       │
//! │                                                                         │
//! │  One statement, one write lock: two callers can never read the same   │
//! │  value, and the first call of a new period starts at 1.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reservations are never given back. A value whose document later fails to
//! save is skipped; codes are unique and increasing but may have gaps.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::Period;

/// Repository for the `code_sequences` table.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Atomically increments the `(series, period)` counter and returns the
    /// new value. A missing counter is created at 1.
    ///
    /// Runs in autocommit, outside any document transaction, so the value
    /// stays consumed whatever happens to the save that uses it.
    pub async fn reserve_next(&self, series: &str, period: &Period) -> DbResult<i64> {
        let key = period.storage_key();

        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO code_sequences (series, period, value)
            VALUES (?1, ?2, 1)
            ON CONFLICT (series, period) DO UPDATE SET
                value = value + 1,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            RETURNING value
            "#,
        )
        .bind(series)
        .bind(&key)
        .fetch_one(&self.pool)
        .await?;

        debug!(series = %series, period = %period, value = value, "Reserved sequence value");
        Ok(value)
    }

    /// Last reserved value for `(series, period)`, `None` if nothing was
    /// reserved yet.
    pub async fn current(&self, series: &str, period: &Period) -> DbResult<Option<i64>> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT value FROM code_sequences WHERE series = ?1 AND period = ?2",
        )
        .bind(series)
        .bind(period.storage_key())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
