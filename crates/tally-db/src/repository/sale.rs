//! # Sale Repository
//!
//! Sales and their lines. Mirror image of sales: selling takes stock
//! out, deleting a sale or lowering a line puts it back.
//!
//! ## Stock Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale → item.qty                                  │
//! │                                                                         │
//! │  create()        SL24xxxxxx, each line       qty -= line.qty            │
//! │  update_lines()  line 5 → 3                  qty += 2                   │
//! │                  new line                    qty -= line.qty            │
//! │                  removed line                qty += line.qty (restock)  │
//! │  delete()        every line                  qty += line.qty            │
//! │                                                                         │
//! │  Stock is allowed to go negative; the low-stock report flags it.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::lines;
use crate::error::{DbError, DbResult};
use crate::persister::RetryingPersister;
use tally_core::validation::{validate_lines, validate_new_sale};
use tally_core::{document_total, DocumentKind, DocumentLine, LineInput, NewSale, Sale, SeriesConfig};

const SALE_COLUMNS: &str =
    "id, code, customer, date, total_cents, description, created_at, updated_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    persister: RetryingPersister,
    series: SeriesConfig,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, persister: RetryingPersister) -> Self {
        SaleRepository {
            pool,
            persister,
            series: SeriesConfig::sale(),
        }
    }

    /// Records a sale and takes its quantities out of stock.
    ///
    /// ## How It Works
    /// 1. Validates input (nothing reserved yet if this fails)
    /// 2. Allocates an `SL` code
    /// 3. In one transaction: sale row, each line, `Insert` event per line
    /// 4. Duplicate `sale.code` → new code, try again (bounded)
    ///
    /// ## Errors
    /// - `Core(Validation)` for bad input
    /// - `ForeignKeyViolation` / `NotFound` for an unknown item
    /// - `PersistenceExhausted` when every attempt hit a code conflict
    pub async fn create(&self, new_sale: NewSale) -> DbResult<Sale> {
        validate_new_sale(&new_sale)?;

        let total_cents = document_total(&new_sale.lines)?.cents();
        let now = Utc::now();
        let pool = self.pool.clone();
        let lines = &new_sale.lines;

        let sale = self
            .persister
            .save_coded(
                &self.series,
                |code| Sale {
                    id: Uuid::new_v4().to_string(),
                    code,
                    customer: new_sale
                        .customer
                        .as_ref()
                        .map(|c| c.trim().to_string()),
                    date: new_sale.date,
                    total_cents,
                    description: new_sale.description.clone(),
                    created_at: now,
                    updated_at: now,
                },
                move |sale| {
                    let pool = pool.clone();
                    async move { insert_with_lines(&pool, sale, lines).await }
                },
            )
            .await?;

        info!(
            id = %sale.id,
            code = %sale.code,
            lines = lines.len(),
            total_cents = sale.total_cents,
            "Sale created"
        );
        Ok(sale)
    }

    /// Replaces the lines of a sale and recomputes its total.
    ///
    /// Lines are matched by id: changed quantities emit `Update` events,
    /// new lines `Insert`, missing lines `Delete`. The code never changes.
    pub async fn update_lines(&self, id: &str, new_lines: Vec<LineInput>) -> DbResult<Sale> {
        validate_lines("sale", &new_lines)?;

        let total_cents = document_total(&new_lines)?.cents();
        let mut tx = self.pool.begin().await?;

        // Write first: takes the write lock and checks existence
        let touched = sqlx::query("UPDATE sale SET total_cents = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(total_cents)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        lines::replace_all(&mut tx, DocumentKind::Sale, id, &new_lines).await?;
        tx.commit().await?;

        debug!(id = %id, total_cents = total_cents, "Sale lines updated");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Deletes a sale, returning its quantities to stock.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE sale SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        lines::delete_all(&mut tx, DocumentKind::Sale, id).await?;
        sqlx::query("DELETE FROM sale WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, "Sale deleted");
        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sale WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sale WHERE code = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Stored lines of a sale.
    pub async fn lines(&self, id: &str) -> DbResult<Vec<DocumentLine>> {
        let mut conn = self.pool.acquire().await?;
        lines::fetch(&mut conn, DocumentKind::Sale, id).await
    }

    /// Sales created at or after `since`.
    pub async fn count_created_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sale WHERE julianday(created_at) >= julianday(?1)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// One save attempt: the sale row and all its lines, or nothing.
async fn insert_with_lines(
    pool: &SqlitePool,
    sale: Sale,
    lines: &[LineInput],
) -> DbResult<Sale> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO sale (
            id, code, customer, date, total_cents, description, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.code)
    .bind(&sale.customer)
    .bind(sale.date)
    .bind(sale.total_cents)
    .bind(&sale.description)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &sale.code),
        other => other,
    })?;

    lines::insert_all(&mut tx, DocumentKind::Sale, &sale.id, lines).await?;
    tx.commit().await?;

    Ok(sale)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use tally_core::{Item, NewItem};

    async fn setup() -> (Database, Item) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let widget = db
            .items()
            .create(NewItem {
                code: "WIDGET".to_string(),
                name: "Widget".to_string(),
                price_cents: 1200,
                qty: 50,
                rop: 20,
            })
            .await
            .unwrap();
        (db, widget)
    }

    fn sale_of(lines: Vec<LineInput>) -> NewSale {
        NewSale {
            customer: Some("Walk-in".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
            description: Some("counter sale".to_string()),
            lines,
        }
    }

    async fn qty(db: &Database, item: &Item) -> i64 {
        db.items().get(&item.id).await.unwrap().unwrap().qty
    }

    #[tokio::test]
    async fn test_create_takes_stock() {
        let (db, widget) = setup().await;

        let sale = db
            .sales()
            .create(sale_of(vec![LineInput::new(&widget.id, 8, 1200)]))
            .await
            .unwrap();

        assert!(sale.code.starts_with("SL"));
        assert_eq!(sale.total_cents, 9600);
        assert_eq!(sale.customer.as_deref(), Some("Walk-in"));
        assert_eq!(qty(&db, &widget).await, 42);
    }

    #[tokio::test]
    async fn test_quantity_change_and_restock() {
        let (db, widget) = setup().await;
        let repo = db.sales();

        let sale = repo
            .create(sale_of(vec![LineInput::new(&widget.id, 5, 1200)]))
            .await
            .unwrap();
        let line = &repo.lines(&sale.id).await.unwrap()[0];
        assert_eq!(qty(&db, &widget).await, 45);

        let mut lower = LineInput::new(&widget.id, 3, 1200);
        lower.id = Some(line.id.clone());
        let updated = repo.update_lines(&sale.id, vec![lower]).await.unwrap();

        assert_eq!(updated.total_cents, 3600);
        assert_eq!(qty(&db, &widget).await, 47);

        repo.delete(&sale.id).await.unwrap();
        assert_eq!(qty(&db, &widget).await, 50);
    }

    #[tokio::test]
    async fn test_price_only_change_moves_no_stock() {
        let (db, widget) = setup().await;
        let repo = db.sales();

        let sale = repo
            .create(sale_of(vec![LineInput::new(&widget.id, 2, 1200)]))
            .await
            .unwrap();
        let line = &repo.lines(&sale.id).await.unwrap()[0];

        let mut discounted = LineInput::new(&widget.id, 2, 1000);
        discounted.id = Some(line.id.clone());
        let updated = repo.update_lines(&sale.id, vec![discounted]).await.unwrap();

        assert_eq!(updated.total_cents, 2000);
        assert_eq!(qty(&db, &widget).await, 48);
    }

    #[tokio::test]
    async fn test_update_missing_sale() {
        let (db, widget) = setup().await;

        let err = db
            .sales()
            .update_lines("missing", vec![LineInput::new(&widget.id, 1, 100)])
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(qty(&db, &widget).await, 50);
    }

    #[tokio::test]
    async fn test_count_created_since() {
        let (db, widget) = setup().await;
        let before = Utc::now() - chrono::Duration::seconds(5);

        for _ in 0..3 {
            db.sales()
                .create(sale_of(vec![LineInput::new(&widget.id, 1, 100)]))
                .await
                .unwrap();
        }

        assert_eq!(db.sales().count_created_since(before).await.unwrap(), 3);
        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(db.sales().count_created_since(later).await.unwrap(), 0);
    }
}
