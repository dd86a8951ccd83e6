//! Line-item writes shared by purchases and sales.
//!
//! Every function here takes the document's open transaction and pairs each
//! row change with its ledger events.

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::ledger::InventoryLedger;
use tally_core::stock::{diff_lines, LineChange, LineState};
use tally_core::{DocumentKind, DocumentLine, LineInput};

fn line_table(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Purchase => "purchase_item",
        DocumentKind::Sale => "sale_item",
    }
}

fn to_state(line: &LineInput) -> LineState {
    LineState {
        line_id: line
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        item_id: line.item_id.clone(),
        qty: line.qty,
        unit_price_cents: line.unit_price_cents,
    }
}

/// Stored lines of a document, in insertion order.
pub(crate) async fn fetch(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: &str,
) -> DbResult<Vec<DocumentLine>> {
    let sql = format!(
        "SELECT id, document_id, item_id, qty, unit_price_cents FROM {} WHERE document_id = ?1 ORDER BY rowid",
        line_table(kind)
    );
    let lines = sqlx::query_as::<_, DocumentLine>(&sql)
        .bind(document_id)
        .fetch_all(conn)
        .await?;

    Ok(lines)
}

/// Inserts the lines of a new document, one `Insert` event each.
pub(crate) async fn insert_all(
    tx: &mut Transaction<'_, Sqlite>,
    kind: DocumentKind,
    document_id: &str,
    lines: &[LineInput],
) -> DbResult<()> {
    for line in lines {
        apply(tx, kind, document_id, &LineChange::Insert(to_state(line))).await?;
    }
    Ok(())
}

/// Brings the stored lines in line with `incoming`.
///
/// Lines are matched by id; a submitted line without an id is new.
pub(crate) async fn replace_all(
    tx: &mut Transaction<'_, Sqlite>,
    kind: DocumentKind,
    document_id: &str,
    incoming: &[LineInput],
) -> DbResult<()> {
    let existing: Vec<LineState> = fetch(&mut **tx, kind, document_id)
        .await?
        .iter()
        .map(DocumentLine::state)
        .collect();
    let incoming: Vec<LineState> = incoming.iter().map(to_state).collect();

    let changes = diff_lines(&existing, &incoming);
    debug!(document_id = %document_id, changes = changes.len(), "Replacing lines");

    for change in &changes {
        apply(tx, kind, document_id, change).await?;
    }
    Ok(())
}

/// Removes every line of a document, one `Delete` event each.
pub(crate) async fn delete_all(
    tx: &mut Transaction<'_, Sqlite>,
    kind: DocumentKind,
    document_id: &str,
) -> DbResult<()> {
    let existing = fetch(&mut **tx, kind, document_id).await?;
    for line in &existing {
        apply(tx, kind, document_id, &LineChange::Delete(line.state())).await?;
    }
    Ok(())
}

/// Writes one row change, then its ledger events.
async fn apply(
    tx: &mut Transaction<'_, Sqlite>,
    kind: DocumentKind,
    document_id: &str,
    change: &LineChange,
) -> DbResult<()> {
    let table = line_table(kind);

    match change {
        LineChange::Insert(line) => {
            let sql = format!(
                "INSERT INTO {table} (id, document_id, item_id, qty, unit_price_cents) VALUES (?1, ?2, ?3, ?4, ?5)"
            );
            sqlx::query(&sql)
                .bind(&line.line_id)
                .bind(document_id)
                .bind(&line.item_id)
                .bind(line.qty)
                .bind(line.unit_price_cents)
                .execute(&mut **tx)
                .await?;
        }
        LineChange::Update { after, .. } => {
            let sql = format!(
                "UPDATE {table} SET item_id = ?1, qty = ?2, unit_price_cents = ?3 WHERE id = ?4 AND document_id = ?5"
            );
            sqlx::query(&sql)
                .bind(&after.item_id)
                .bind(after.qty)
                .bind(after.unit_price_cents)
                .bind(&after.line_id)
                .bind(document_id)
                .execute(&mut **tx)
                .await?;
        }
        LineChange::Delete(line) => {
            let sql = format!("DELETE FROM {table} WHERE id = ?1 AND document_id = ?2");
            sqlx::query(&sql)
                .bind(&line.line_id)
                .bind(document_id)
                .execute(&mut **tx)
                .await?;
        }
    }

    for event in change.events(kind) {
        InventoryLedger::apply_line_item_event(tx, &event).await?;
    }
    Ok(())
}
