//! # Item Repository
//!
//! Item master data. `qty` is set once at creation (opening stock); after
//! that only the inventory ledger writes it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_new_item;
use tally_core::{Item, NewItem};

const ITEM_COLUMNS: &str = "id, code, name, price_cents, qty, rop, created_at, updated_at";

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Creates an item with its opening stock.
    ///
    /// ## Errors
    /// - `Core(Validation)` for bad input
    /// - `UniqueViolation` on `item.code` if the code is taken
    pub async fn create(&self, new_item: NewItem) -> DbResult<Item> {
        validate_new_item(&new_item)?;

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            code: new_item.code.trim().to_string(),
            name: new_item.name.trim().to_string(),
            price_cents: new_item.price_cents,
            qty: new_item.qty,
            rop: new_item.rop,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, code = %item.code, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO item (id, code, name, price_cents, qty, rop, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(item.qty)
        .bind(item.rop)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &item.code),
            other => other,
        })?;

        Ok(item)
    }

    /// Gets an item by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM item WHERE id = ?1");
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Gets an item by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM item WHERE code = ?1");
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Lists items ordered by code.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM item ORDER BY code LIMIT ?1");
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Updates name, price and reorder point. Never touches `qty`.
    pub async fn update_details(
        &self,
        id: &str,
        name: &str,
        price_cents: i64,
        rop: i64,
    ) -> DbResult<Item> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        validate_new_item(&NewItem {
            code: current.code.clone(),
            name: name.to_string(),
            price_cents,
            qty: current.qty,
            rop,
        })?;

        debug!(id = %id, "Updating item details");

        sqlx::query(
            r#"
            UPDATE item
            SET name = ?1, price_cents = ?2, rop = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(name.trim())
        .bind(price_cents)
        .bind(rop)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    /// Counts all items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> ItemRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.items()
    }

    fn washer() -> NewItem {
        NewItem {
            code: "WSH-8".to_string(),
            name: "Washer M8".to_string(),
            price_cents: 5,
            qty: 500,
            rop: 100,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup().await;
        let item = repo.create(washer()).await.unwrap();

        let by_id = repo.get(&item.id).await.unwrap().unwrap();
        let by_code = repo.get_by_code("WSH-8").await.unwrap().unwrap();

        assert_eq!(by_id.id, by_code.id);
        assert_eq!(by_id.qty, 500);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let repo = setup().await;
        repo.create(washer()).await.unwrap();

        let err = repo.create(washer()).await.unwrap_err();
        assert!(err.is_unique_violation_on("item.code"));
    }

    #[tokio::test]
    async fn test_update_details_keeps_qty() {
        let repo = setup().await;
        let item = repo.create(washer()).await.unwrap();

        let updated = repo
            .update_details(&item.id, "Washer M8 zinc", 7, 150)
            .await
            .unwrap();

        assert_eq!(updated.name, "Washer M8 zinc");
        assert_eq!(updated.price_cents, 7);
        assert_eq!(updated.rop, 150);
        assert_eq!(updated.qty, 500);
    }

    #[tokio::test]
    async fn test_list_ordered_by_code() {
        let repo = setup().await;
        for code in ["C", "A", "B"] {
            let mut item = washer();
            item.code = code.to_string();
            repo.create(item).await.unwrap();
        }

        let codes: Vec<_> = repo
            .list(10)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }
}
