//! # Stock Effects
//!
//! Pure rules for how a line-item mutation moves an item's quantity.
//! `tally-db::ledger` applies these inside the document transaction.
//!
//! ## Effect Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Stock effect of one line-item event                     │
//! │                                                                         │
//! │               │  Insert (qty)  │  Update (new-old)  │  Delete (qty)     │
//! │  ─────────────┼────────────────┼────────────────────┼────────────────── │
//! │   Purchase    │     + qty      │     + delta        │     - qty         │
//! │   Sale        │     - qty      │     - delta        │     + qty         │
//! │                                                                         │
//! │  Invariant: item.qty - initial qty == Σ stock_effect(event)            │
//! │           == Σ live purchase line qty - Σ live sale line qty           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Event Types
// =============================================================================

/// Which document a line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Stock comes in.
    Purchase,
    /// Stock goes out.
    Sale,
}

impl DocumentKind {
    /// +1 for purchases, -1 for sales.
    #[inline]
    pub const fn direction(&self) -> i64 {
        match self {
            DocumentKind::Purchase => 1,
            DocumentKind::Sale => -1,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Purchase => write!(f, "purchase"),
            DocumentKind::Sale => write!(f, "sale"),
        }
    }
}

/// What happened to the line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Insert,
    Update,
    Delete,
}

/// The quantity effect of one line-item mutation.
///
/// `delta_qty` is the line quantity for inserts and deletes, and
/// `new_qty - old_qty` for updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemEvent {
    pub item_id: String,
    pub delta_qty: i64,
    pub kind: EventKind,
    pub document_kind: DocumentKind,
}

impl LineItemEvent {
    pub fn insert(document_kind: DocumentKind, item_id: impl Into<String>, qty: i64) -> Self {
        LineItemEvent {
            item_id: item_id.into(),
            delta_qty: qty,
            kind: EventKind::Insert,
            document_kind,
        }
    }

    pub fn update(
        document_kind: DocumentKind,
        item_id: impl Into<String>,
        old_qty: i64,
        new_qty: i64,
    ) -> Self {
        LineItemEvent {
            item_id: item_id.into(),
            delta_qty: new_qty - old_qty,
            kind: EventKind::Update,
            document_kind,
        }
    }

    pub fn delete(document_kind: DocumentKind, item_id: impl Into<String>, qty: i64) -> Self {
        LineItemEvent {
            item_id: item_id.into(),
            delta_qty: qty,
            kind: EventKind::Delete,
            document_kind,
        }
    }

    /// Signed change this event makes to `item.qty`.
    pub fn stock_effect(&self) -> i64 {
        let sign = match self.kind {
            EventKind::Insert | EventKind::Update => 1,
            EventKind::Delete => -1,
        };
        sign * self.document_kind.direction() * self.delta_qty
    }
}

// =============================================================================
// Line Diffing
// =============================================================================

/// The stock-relevant state of one persisted or submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineState {
    pub line_id: String,
    pub item_id: String,
    pub qty: i64,
    pub unit_price_cents: i64,
}

/// One row-level change needed to turn the stored lines into the submitted ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    Insert(LineState),
    Update { before: LineState, after: LineState },
    Delete(LineState),
}

impl LineChange {
    /// Ledger events for this change.
    ///
    /// Moving a line to a different item is a delete on the old item and an
    /// insert on the new one. A price-only update moves no stock.
    pub fn events(&self, document_kind: DocumentKind) -> Vec<LineItemEvent> {
        match self {
            LineChange::Insert(line) => {
                vec![LineItemEvent::insert(document_kind, &line.item_id, line.qty)]
            }
            LineChange::Delete(line) => {
                vec![LineItemEvent::delete(document_kind, &line.item_id, line.qty)]
            }
            LineChange::Update { before, after } if before.item_id != after.item_id => vec![
                LineItemEvent::delete(document_kind, &before.item_id, before.qty),
                LineItemEvent::insert(document_kind, &after.item_id, after.qty),
            ],
            LineChange::Update { before, after } if before.qty != after.qty => {
                vec![LineItemEvent::update(
                    document_kind,
                    &after.item_id,
                    before.qty,
                    after.qty,
                )]
            }
            LineChange::Update { .. } => Vec::new(),
        }
    }
}

/// Computes the changes from `existing` to `incoming`, matching by line id.
///
/// Deletes come first, then updates and inserts in submission order.
/// Unchanged lines produce nothing.
pub fn diff_lines(existing: &[LineState], incoming: &[LineState]) -> Vec<LineChange> {
    let submitted: HashMap<&str, &LineState> = incoming
        .iter()
        .map(|line| (line.line_id.as_str(), line))
        .collect();
    let stored: HashMap<&str, &LineState> = existing
        .iter()
        .map(|line| (line.line_id.as_str(), line))
        .collect();

    let mut changes: Vec<LineChange> = existing
        .iter()
        .filter(|line| !submitted.contains_key(line.line_id.as_str()))
        .map(|line| LineChange::Delete(line.clone()))
        .collect();

    for line in incoming {
        match stored.get(line.line_id.as_str()) {
            None => changes.push(LineChange::Insert(line.clone())),
            Some(before) if *before != line => changes.push(LineChange::Update {
                before: (*before).clone(),
                after: line.clone(),
            }),
            Some(_) => {}
        }
    }

    changes
}

// =============================================================================
// Unit Tests
// =============================================================================
