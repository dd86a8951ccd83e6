//! # Inventory Ledger
//!
//! Keeps `item.qty` equal to the opening stock plus the effect of every
//! committed line-item event.
//!
//! ## Transaction Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                One document save = one transaction                      │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT INTO purchase ...               (code PU24000007)            │
//! │    INSERT INTO purchase_item ... ──► apply_line_item_event(tx, +5)     │
//! │    INSERT INTO purchase_item ... ──► apply_line_item_event(tx, +2)     │
//! │  COMMIT   (or ROLLBACK: no line, no stock change)                      │
//! │                                                                         │
//! │  apply_line_item_event only accepts a &mut Transaction, so a stock     │
//! │  update can never be committed apart from the line that caused it.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{LineItemEvent, LowStockItem};

/// Stock maintenance and the reorder-point query.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Adds the stock effect of `event` to its item, inside `tx`.
    ///
    /// ## Errors
    /// `NotFound` if the item does not exist. The caller's transaction must
    /// then be dropped (rolled back) along with the line that caused it.
    pub async fn apply_line_item_event(
        tx: &mut Transaction<'_, Sqlite>,
        event: &LineItemEvent,
    ) -> DbResult<()> {
        let effect = event.stock_effect();

        let result = sqlx::query("UPDATE item SET qty = qty + ?1, updated_at = ?2 WHERE id = ?3")
            .bind(effect)
            .bind(Utc::now())
            .bind(&event.item_id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", &event.item_id));
        }

        debug!(
            item_id = %event.item_id,
            document = %event.document_kind,
            kind = ?event.kind,
            effect = effect,
            "Applied line-item event"
        );
        Ok(())
    }

    /// Items whose quantity is below their reorder point, largest shortfall
    /// first.
    pub async fn low_stock_items(&self) -> DbResult<Vec<LowStockItem>> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT id AS item_id, code, name, qty, rop
            FROM item
            WHERE qty < rop
            ORDER BY (rop - qty) DESC, code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Low stock query");
        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{DocumentKind, NewItem};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_item(code: &str, qty: i64, rop: i64) -> NewItem {
        NewItem {
            code: code.to_string(),
            name: format!("Item {code}"),
            price_cents: 500,
            qty,
            rop,
        }
    }

    #[tokio::test]
    async fn test_committed_events_move_stock() {
        let db = setup().await;
        let item = db.items().create(new_item("BOLT", 100, 10)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let events = [
            LineItemEvent::insert(DocumentKind::Purchase, &item.id, 5),
            LineItemEvent::insert(DocumentKind::Sale, &item.id, 8),
            LineItemEvent::update(DocumentKind::Sale, &item.id, 8, 3),
            LineItemEvent::delete(DocumentKind::Purchase, &item.id, 5),
        ];
        for event in &events {
            InventoryLedger::apply_line_item_event(&mut tx, event).await.unwrap();
        }
        tx.commit().await.unwrap();

        // +5 -8 +5 -5
        let item = db.items().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.qty, 97);
    }

    #[tokio::test]
    async fn test_rollback_leaves_stock_unchanged() {
        let db = setup().await;
        let item = db.items().create(new_item("NUT", 40, 0)).await.unwrap();

        {
            let mut tx = db.pool().begin().await.unwrap();
            let event = LineItemEvent::insert(DocumentKind::Sale, &item.id, 15);
            InventoryLedger::apply_line_item_event(&mut tx, &event).await.unwrap();
            // dropped without commit
        }

        let item = db.items().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.qty, 40);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let db = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let event = LineItemEvent::insert(DocumentKind::Purchase, "missing", 1);
        let err = InventoryLedger::apply_line_item_event(&mut tx, &event)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_low_stock_ordered_by_shortfall() {
        let db = setup().await;
        db.items().create(new_item("A", 9, 10)).await.unwrap();
        db.items().create(new_item("B", 0, 25)).await.unwrap();
        db.items().create(new_item("C", 10, 10)).await.unwrap();
        db.items().create(new_item("D", 50, 10)).await.unwrap();

        let low = db.ledger().low_stock_items().await.unwrap();
        let codes: Vec<_> = low.iter().map(|i| i.code.as_str()).collect();

        // qty == rop is not low
        assert_eq!(codes, vec!["B", "A"]);
        assert_eq!(low[0].shortfall(), 25);
    }
}
