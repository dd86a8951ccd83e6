//! # Domain Types
//!
//! Items, the three document types and their line items.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │ Purchase / Sale │   │     Salary      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code           │   │  code PU24..    │   │  code SA24..    │       │
//! │  │  qty  ◄─────────┼───┤  lines[]        │   │  amount_cents   │       │
//! │  │  rop            │   │  total_cents    │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  qty is written only by the inventory ledger                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `code`: human-readable business id (`PU24000007`)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::stock::LineState;
use crate::validation::ValidationResult;

// =============================================================================
// Item
// =============================================================================

/// A stocked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier.
    pub code: String,

    pub name: String,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Current stock. Running total of every committed line-item event.
    pub qty: i64,

    /// Reorder point: below this the item is reported as low stock.
    pub rop: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Whether the item is under its reorder point.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.qty < self.rop
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Input for creating an item. `qty` is the opening stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub price_cents: i64,
    pub qty: i64,
    pub rop: i64,
}

/// An item flagged by the reorder-point check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LowStockItem {
    pub item_id: String,
    pub code: String,
    pub name: String,
    pub qty: i64,
    pub rop: i64,
}

impl LowStockItem {
    /// Units needed to get back to the reorder point.
    #[inline]
    pub fn shortfall(&self) -> i64 {
        self.rop - self.qty
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A stored purchase or sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DocumentLine {
    pub id: String,
    pub document_id: String,
    pub item_id: String,
    pub qty: i64,
    pub unit_price_cents: i64,
}

impl DocumentLine {
    /// `unit_price × qty`, `None` if it does not fit in an `i64`.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_multiply_quantity(self.qty)
    }

    pub fn state(&self) -> LineState {
        LineState {
            line_id: self.id.clone(),
            item_id: self.item_id.clone(),
            qty: self.qty,
            unit_price_cents: self.unit_price_cents,
        }
    }
}

/// A submitted line. `id` is `None` for lines the caller is adding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub id: Option<String>,
    pub item_id: String,
    pub qty: i64,
    pub unit_price_cents: i64,
}

impl LineInput {
    /// A fresh line without an id.
    pub fn new(item_id: impl Into<String>, qty: i64, unit_price_cents: i64) -> Self {
        LineInput {
            id: None,
            item_id: item_id.into(),
            qty,
            unit_price_cents,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_multiply_quantity(self.qty)
    }
}

/// Sum of `qty × unit_price` over the submitted lines.
///
/// Fails with `AmountOverflow` when a line total or the sum leaves `i64`.
pub fn document_total(lines: &[LineInput]) -> ValidationResult<Money> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        line.line_total()
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| ValidationError::AmountOverflow {
                field: "total".to_string(),
            })
    })
}

// =============================================================================
// Purchase
// =============================================================================

/// Goods received from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    /// `PU` series code.
    pub code: String,
    pub supplier: String,
    pub date: NaiveDate,
    pub total_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub supplier: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub lines: Vec<LineInput>,
}

// =============================================================================
// Sale
// =============================================================================

/// Goods sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// `SL` series code.
    pub code: String,
    pub customer: Option<String>,
    pub date: NaiveDate,
    pub total_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub customer: Option<String>,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub lines: Vec<LineInput>,
}

// =============================================================================
// Salary
// =============================================================================

/// A salary payment. Shares code allocation with the other documents but
/// has no line items and never touches stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Salary {
    pub id: String,
    /// `SA` series code.
    pub code: String,
    pub employee: String,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a salary payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalary {
    pub employee: String,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_total() {
        let lines = vec![LineInput::new("a", 5, 1000), LineInput::new("b", 2, 2000)];
        assert_eq!(document_total(&lines).unwrap().cents(), 9000);
        assert_eq!(document_total(&[]).unwrap().cents(), 0);
    }

    #[test]
    fn test_document_total_overflow_is_rejected() {
        let line = vec![LineInput::new("a", 3, i64::MAX / 2)];
        assert!(matches!(
            document_total(&line),
            Err(ValidationError::AmountOverflow { .. })
        ));

        // Each line fits, the sum does not
        let lines = vec![
            LineInput::new("a", 1, i64::MAX - 10),
            LineInput::new("b", 1, 11),
        ];
        assert!(document_total(&lines).is_err());
    }

    #[test]
    fn test_low_stock_shortfall() {
        let low = LowStockItem {
            item_id: "i".to_string(),
            code: "IT001".to_string(),
            name: "Bolt".to_string(),
            qty: 3,
            rop: 10,
        };
        assert_eq!(low.shortfall(), 7);
    }
}
