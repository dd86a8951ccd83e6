//! # Stock Reconciliation
//!
//! One run of the reorder-point check: query, log, optionally write JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_core::LowStockItem;
use tally_db::Database;
use tracing::{info, warn};

use crate::error::ReportResult;

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub generated_at: DateTime<Utc>,
    pub item_count: i64,
    /// Largest shortfall first.
    pub low_stock: Vec<LowStockItem>,
}

/// Runs the reorder-point check once.
pub async fn run_once(db: &Database, output_path: Option<&Path>) -> ReportResult<StockReport> {
    let low_stock = db.ledger().low_stock_items().await?;
    let item_count = db.items().count().await?;

    for item in &low_stock {
        warn!(
            code = %item.code,
            name = %item.name,
            qty = item.qty,
            rop = item.rop,
            shortfall = item.shortfall(),
            "Item below reorder point"
        );
    }

    let report = StockReport {
        generated_at: Utc::now(),
        item_count,
        low_stock,
    };

    if let Some(path) = output_path {
        write_report(&report, path)?;
    }

    info!(
        items = report.item_count,
        low_stock = report.low_stock.len(),
        "Stock reconciliation complete"
    );
    Ok(report)
}

fn write_report(report: &StockReport, path: &Path) -> ReportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Readers never see a half-written file
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(report)?)?;
    std::fs::rename(&tmp, path)?;

    info!(path = %path.display(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::NewItem;
    use tally_db::DbConfig;

    async fn stocked_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (code, qty, rop) in [("A", 2, 10), ("B", 50, 10), ("C", 0, 30)] {
            db.items()
                .create(NewItem {
                    code: code.to_string(),
                    name: format!("Item {code}"),
                    price_cents: 100,
                    qty,
                    rop,
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_report_lists_low_stock() {
        let db = stocked_db().await;

        let report = run_once(&db, None).await.unwrap();

        assert_eq!(report.item_count, 3);
        let codes: Vec<_> = report.low_stock.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn test_report_written_as_json() {
        let db = stocked_db().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("low-stock.json");

        let report = run_once(&db, Some(&path)).await.unwrap();

        let written: StockReport =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, report);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
