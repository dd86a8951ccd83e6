//! # Purchase Repository
//!
//! Purchases and their lines. Every write moves stock through the
//! inventory ledger in the same transaction.
//!
//! ## Purchase Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Purchase Lifecycle                                │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → code PU24xxxxxx, lines inserted, stock +qty         │
//! │         (retried with a fresh code on a duplicate purchase.code)       │
//! │                                                                         │
//! │  2. EDIT LINES                                                         │
//! │     └── update_lines() → diff by line id, stock ±delta, new total      │
//! │         (code unchanged)                                               │
//! │                                                                         │
//! │  3. DELETE                                                             │
//! │     └── delete() → lines removed, stock -qty, document removed         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::lines;
use crate::error::{DbError, DbResult};
use crate::persister::RetryingPersister;
use tally_core::validation::{validate_lines, validate_new_purchase};
use tally_core::{document_total, DocumentKind, DocumentLine, LineInput, NewPurchase, Purchase, SeriesConfig};

const PURCHASE_COLUMNS: &str =
    "id, code, supplier, date, total_cents, description, created_at, updated_at";

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    persister: RetryingPersister,
    series: SeriesConfig,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool, persister: RetryingPersister) -> Self {
        PurchaseRepository {
            pool,
            persister,
            series: SeriesConfig::purchase(),
        }
    }

    /// Records a purchase and adds its quantities to stock.
    ///
    /// ## How It Works
    /// 1. Validates input (nothing reserved yet if this fails)
    /// 2. Allocates a `PU` code
    /// 3. In one transaction: purchase row, each line, `Insert` event per line
    /// 4. Duplicate `purchase.code` → new code, try again (bounded)
    ///
    /// ## Errors
    /// - `Core(Validation)` for bad input
    /// - `ForeignKeyViolation` / `NotFound` for an unknown item
    /// - `PersistenceExhausted` when every attempt hit a code conflict
    pub async fn create(&self, new_purchase: NewPurchase) -> DbResult<Purchase> {
        validate_new_purchase(&new_purchase)?;

        let total_cents = document_total(&new_purchase.lines)?.cents();
        let now = Utc::now();
        let pool = self.pool.clone();
        let lines = &new_purchase.lines;

        let purchase = self
            .persister
            .save_coded(
                &self.series,
                |code| Purchase {
                    id: Uuid::new_v4().to_string(),
                    code,
                    supplier: new_purchase.supplier.trim().to_string(),
                    date: new_purchase.date,
                    total_cents,
                    description: new_purchase.description.clone(),
                    created_at: now,
                    updated_at: now,
                },
                move |purchase| {
                    let pool = pool.clone();
                    async move { insert_with_lines(&pool, purchase, lines).await }
                },
            )
            .await?;

        info!(
            id = %purchase.id,
            code = %purchase.code,
            lines = lines.len(),
            total_cents = purchase.total_cents,
            "Purchase created"
        );
        Ok(purchase)
    }

    /// Replaces the lines of a purchase and recomputes its total.
    ///
    /// Lines are matched by id: changed quantities emit `Update` events,
    /// new lines `Insert`, missing lines `Delete`. The code never changes.
    pub async fn update_lines(&self, id: &str, new_lines: Vec<LineInput>) -> DbResult<Purchase> {
        validate_lines("purchase", &new_lines)?;

        let total_cents = document_total(&new_lines)?.cents();
        let mut tx = self.pool.begin().await?;

        // Write first: takes the write lock and checks existence
        let touched = sqlx::query("UPDATE purchase SET total_cents = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(total_cents)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        lines::replace_all(&mut tx, DocumentKind::Purchase, id, &new_lines).await?;
        tx.commit().await?;

        debug!(id = %id, total_cents = total_cents, "Purchase lines updated");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))
    }

    /// Deletes a purchase, taking its quantities back out of stock.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE purchase SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        lines::delete_all(&mut tx, DocumentKind::Purchase, id).await?;
        sqlx::query("DELETE FROM purchase WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, "Purchase deleted");
        Ok(())
    }

    /// Gets a purchase by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchase WHERE id = ?1");
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// Gets a purchase by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchase WHERE code = ?1");
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// Stored lines of a purchase.
    pub async fn lines(&self, id: &str) -> DbResult<Vec<DocumentLine>> {
        let mut conn = self.pool.acquire().await?;
        lines::fetch(&mut conn, DocumentKind::Purchase, id).await
    }

    /// Purchases created at or after `since`.
    pub async fn count_created_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase WHERE julianday(created_at) >= julianday(?1)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// One save attempt: the purchase row and all its lines, or nothing.
async fn insert_with_lines(
    pool: &SqlitePool,
    purchase: Purchase,
    lines: &[LineInput],
) -> DbResult<Purchase> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO purchase (
            id, code, supplier, date, total_cents, description, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.code)
    .bind(&purchase.supplier)
    .bind(purchase.date)
    .bind(purchase.total_cents)
    .bind(&purchase.description)
    .bind(purchase.created_at)
    .bind(purchase.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &purchase.code),
        other => other,
    })?;

    lines::insert_all(&mut tx, DocumentKind::Purchase, &purchase.id, lines).await?;
    tx.commit().await?;

    Ok(purchase)
}

// =============================================================================
// Unit Tests
// =============================================================================
