//! # Validation Module
//!
//! Input checks run before a counter is reserved or stock is moved.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── Required fields, ranges                                           │
//! │  └── Line item sanity (qty > 0, no duplicate ids)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── UNIQUE(code) per document table                                   │
//! │  ├── CHECK(qty > 0) on line tables                                     │
//! │  └── Foreign keys to item / document                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures never consume a sequence value: callers validate
//! first, then allocate.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{document_total, LineInput, NewItem, NewPurchase, NewSalary, NewSale};
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a new item.
///
/// ## Rules
/// - `code` and `name` are required (≤ 50 / ≤ 200 characters)
/// - price, opening qty and reorder point are not negative
pub fn validate_new_item(item: &NewItem) -> ValidationResult<()> {
    required("code", &item.code, 50)?;
    required("name", &item.name, 200)?;
    non_negative("price", item.price_cents)?;
    non_negative("qty", item.qty)?;
    non_negative("rop", item.rop)?;
    Ok(())
}

/// Validates one line quantity.
///
/// ```rust
/// use tally_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates the lines of a purchase or sale.
///
/// ## Rules
/// - at least one line
/// - every line names an item, has a valid quantity and a non-negative price
/// - no line id appears twice
/// - the document total fits in 64-bit cents
pub fn validate_lines(document: &str, lines: &[LineInput]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::NoLines {
            document: document.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for line in lines {
        required("item", &line.item_id, 64)?;
        validate_quantity(line.qty)?;
        non_negative("unit price", line.unit_price_cents)?;

        if let Some(id) = &line.id {
            if !seen.insert(id.as_str()) {
                return Err(ValidationError::DuplicateLine {
                    line_id: id.clone(),
                });
            }
        }
    }

    document_total(lines)?;
    Ok(())
}

/// Validates a purchase: supplier required, lines per [`validate_lines`].
pub fn validate_new_purchase(purchase: &NewPurchase) -> ValidationResult<()> {
    required("supplier", &purchase.supplier, 200)?;
    validate_lines("purchase", &purchase.lines)
}

/// Validates a sale. Walk-in sales have no customer.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    if let Some(customer) = &sale.customer {
        required("customer", customer, 200)?;
    }
    validate_lines("sale", &sale.lines)
}

/// Validates a salary payment.
pub fn validate_new_salary(salary: &NewSalary) -> ValidationResult<()> {
    required("employee", &salary.employee, 200)?;
    if salary.amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_lines_required() {
        assert!(matches!(
            validate_lines("purchase", &[]),
            Err(ValidationError::NoLines { .. })
        ));
    }

    #[test]
    fn test_line_quantity_bounds() {
        let ok = LineInput::new("item-1", 5, 1000);
        let zero = LineInput::new("item-1", 0, 1000);
        let huge = LineInput::new("item-1", MAX_LINE_QUANTITY + 1, 1000);

        assert!(validate_lines("sale", &[ok]).is_ok());
        assert!(validate_lines("sale", &[zero]).is_err());
        assert!(matches!(
            validate_lines("sale", &[huge]),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_duplicate_line_ids() {
        let mut a = LineInput::new("item-1", 1, 100);
        a.id = Some("line-1".to_string());
        let b = a.clone();

        assert!(matches!(
            validate_lines("purchase", &[a, b]),
            Err(ValidationError::DuplicateLine { .. })
        ));
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let line = LineInput::new("item-1", 3, i64::MAX / 2);
        assert!(matches!(
            validate_lines("purchase", &[line]),
            Err(ValidationError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let line = LineInput::new("item-1", 1, -1);
        assert!(validate_lines("purchase", &[line]).is_err());
    }

    #[test]
    fn test_new_item() {
        let mut item = NewItem {
            code: "IT0001".to_string(),
            name: "Hex bolt M8".to_string(),
            price_cents: 25,
            qty: 100,
            rop: 20,
        };
        assert!(validate_new_item(&item).is_ok());

        item.rop = -1;
        assert!(validate_new_item(&item).is_err());

        item.rop = 0;
        item.name = "  ".to_string();
        assert!(matches!(
            validate_new_item(&item),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_purchase_needs_supplier() {
        let purchase = NewPurchase {
            supplier: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            description: None,
            lines: vec![LineInput::new("item-1", 1, 100)],
        };
        assert!(matches!(
            validate_new_purchase(&purchase),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_walk_in_sale() {
        let sale = NewSale {
            customer: None,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            description: None,
            lines: vec![LineInput::new("item-1", 2, 100)],
        };
        assert!(validate_new_sale(&sale).is_ok());
    }

    #[test]
    fn test_salary_amount_positive() {
        let salary = NewSalary {
            employee: "E-0042".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            amount_cents: 0,
            description: None,
        };
        assert!(validate_new_salary(&salary).is_err());
    }
}
